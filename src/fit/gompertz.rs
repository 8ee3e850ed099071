//! Gompertz growth curve `y(t) = L + (U - L)·exp(-exp(-kG·(t - Ti)))`.
//!
//! Fitting is seeded from a linearisation of the model and refined with a
//! damped Gauss-Newton (Levenberg-Marquardt) loop on the squared residuals.
use log::debug;
use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};

/// Model parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Gompertz {
    /// Upper plateau.
    pub u: f64,
    /// Lower plateau.
    pub l: f64,
    /// Inflection time.
    pub ti: f64,
    /// Growth rate.
    pub kg: f64,
}

impl Gompertz {
    pub fn predict(&self, t: f64) -> f64 {
        self.l + (self.u - self.l) * (-(-self.kg * (t - self.ti)).exp()).exp()
    }

    /// `dy/dt`.
    pub fn derivative(&self, t: f64) -> f64 {
        let s = self.kg * (t - self.ti);
        (self.u - self.l) * self.kg * (-(-s).exp() - s).exp()
    }

    /// Partial derivatives of `predict(t)` w.r.t. `(U, L, Ti, kG)`.
    fn gradient(&self, t: f64) -> Vector4<f64> {
        let dt = t - self.ti;
        let z = (-self.kg * dt).exp();
        let e = (-z).exp();
        let span = self.u - self.l;
        Vector4::new(e, 1.0 - e, -span * e * z * self.kg, span * e * z * dt)
    }

    fn from_vector(v: &Vector4<f64>) -> Self {
        Self {
            u: v[0],
            l: v[1],
            ti: v[2],
            kg: v[3],
        }
    }

    fn to_vector(self) -> Vector4<f64> {
        Vector4::new(self.u, self.l, self.ti, self.kg)
    }

    fn is_finite(&self) -> bool {
        self.u.is_finite() && self.l.is_finite() && self.ti.is_finite() && self.kg.is_finite()
    }
}

/// Ordinary least squares `y = intercept + slope·x`.
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mx = x[..n].iter().sum::<f64>() / nf;
    let my = y[..n].iter().sum::<f64>() / nf;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (xi, yi) in x.iter().zip(y).take(n) {
        sxy += (xi - mx) * (yi - my);
        sxx += (xi - mx) * (xi - mx);
    }
    if sxx <= 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some((my - slope * mx, slope))
}

/// Starting point from the linearised model.
///
/// `U₀ = 1.05·max(y)`, `L₀ = 0.95·min(y)`; regressing
/// `ln(-ln((y - L₀)/(U₀ - L₀)))` on `t` over its finite values gives
/// intercept `k` and slope `-kG₀`, and `Ti₀ = k / kG₀`.
pub fn initial_guess(t: &[f64], y: &[f64]) -> Option<Gompertz> {
    let max = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = y.iter().copied().fold(f64::INFINITY, f64::min);
    let u = 1.05 * max;
    let l = 0.95 * min;
    let (xs, ps): (Vec<f64>, Vec<f64>) = t
        .iter()
        .zip(y)
        .map(|(&ti, &yi)| (ti, (-((yi - l) / (u - l)).ln()).ln()))
        .filter(|(ti, p)| ti.is_finite() && p.is_finite())
        .unzip();
    let (k, slope) = linear_regression(&xs, &ps)?;
    let kg = -slope;
    let guess = Gompertz {
        u,
        l,
        ti: k / kg,
        kg,
    };
    guess.is_finite().then_some(guess)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmParams {
    pub max_iterations: usize,
    /// Stop once the relative decrease of the residual sum falls below this.
    pub tolerance: f64,
    pub initial_damping: f64,
}

impl Default for LmParams {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-12,
            initial_damping: 1e-3,
        }
    }
}

fn sum_squares(model: &Gompertz, t: &[f64], y: &[f64]) -> f64 {
    t.iter()
        .zip(y)
        .map(|(&ti, &yi)| {
            let r = yi - model.predict(ti);
            r * r
        })
        .sum()
}

/// Levenberg-Marquardt refinement of `init`. `None` if the model degenerates.
pub fn levenberg_marquardt(t: &[f64], y: &[f64], init: Gompertz, params: &LmParams) -> Option<Gompertz> {
    let mut model = init;
    let mut sse = sum_squares(&model, t, y);
    if !sse.is_finite() {
        return None;
    }
    let mut damping = params.initial_damping;
    for iter in 0..params.max_iterations {
        let mut h = Matrix4::<f64>::zeros();
        let mut g = Vector4::<f64>::zeros();
        for (&ti, &yi) in t.iter().zip(y) {
            let j = model.gradient(ti);
            let r = yi - model.predict(ti);
            h += j * j.transpose();
            g += j * r;
        }

        let mut improved = false;
        while damping < 1e16 {
            let mut a = h;
            for k in 0..4 {
                a[(k, k)] += damping * h[(k, k)].max(1e-12);
            }
            let Some(step) = a.lu().solve(&g) else {
                damping *= 10.0;
                continue;
            };
            let candidate = Gompertz::from_vector(&(model.to_vector() + step));
            let candidate_sse = sum_squares(&candidate, t, y);
            if candidate.is_finite() && candidate_sse.is_finite() && candidate_sse <= sse {
                let decrease = sse - candidate_sse;
                model = candidate;
                let previous = sse;
                sse = candidate_sse;
                damping = (damping / 10.0).max(1e-15);
                improved = true;
                if decrease <= params.tolerance * previous.max(f64::MIN_POSITIVE) {
                    debug!("gompertz converged after {} iterations", iter + 1);
                    return Some(model);
                }
                break;
            }
            damping *= 10.0;
        }
        if !improved {
            debug!("gompertz stalled after {} iterations", iter + 1);
            break;
        }
    }
    model.is_finite().then_some(model)
}

/// Fitted model with its derived summaries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GompertzFit {
    pub model: Gompertz,
    /// Root mean squared residual.
    pub sd: f64,
    /// Tangent slope at the inflection point.
    pub slope: f64,
    /// Intercept of that tangent line.
    pub yintercept: f64,
}

/// Seed, refine and summarise. `None` when either step fails.
pub fn fit_gompertz(t: &[f64], y: &[f64], params: &LmParams) -> Option<GompertzFit> {
    let init = initial_guess(t, y)?;
    let model = levenberg_marquardt(t, y, init, params)?;
    let sd = (sum_squares(&model, t, y) / t.len().max(1) as f64).sqrt();
    let slope = model.derivative(model.ti);
    Some(GompertzFit {
        model,
        sd,
        slope,
        yintercept: model.predict(model.ti) - model.ti * slope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRUTH: Gompertz = Gompertz {
        u: 200.0,
        l: 10.0,
        ti: 40.0,
        kg: 0.05,
    };

    /// Deterministic noise in `[-0.5, 0.5]`.
    fn noise(i: usize) -> f64 {
        ((i * 7919 + 13) % 101) as f64 / 100.0 - 0.5
    }

    #[test]
    fn derivative_matches_finite_difference() {
        for t in [0.0, 25.0, 40.0, 80.0] {
            let h = 1e-5;
            let fd = (TRUTH.predict(t + h) - TRUTH.predict(t - h)) / (2.0 * h);
            assert!((fd - TRUTH.derivative(t)).abs() < 1e-6);
        }
    }

    #[test]
    fn recovers_synthetic_parameters() {
        let t: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let eps: Vec<f64> = (0..t.len()).map(noise).collect();
        let y: Vec<f64> = t.iter().zip(&eps).map(|(&ti, e)| TRUTH.predict(ti) + e).collect();

        let fit = fit_gompertz(&t, &y, &LmParams::default()).unwrap();
        let m = fit.model;
        assert!((m.u - 200.0).abs() < 5.0, "U = {}", m.u);
        assert!((m.l - 10.0).abs() < 2.0, "L = {}", m.l);
        assert!((m.kg - 0.05).abs() < 0.005, "kG = {}", m.kg);
        assert!((m.ti - 40.0).abs() < 2.0, "Ti = {}", m.ti);

        let rms = (eps.iter().map(|e| e * e).sum::<f64>() / eps.len() as f64).sqrt();
        assert!((fit.sd - rms).abs() < 0.5 * rms, "sd {} vs noise {}", fit.sd, rms);

        // The tangent at Ti passes through the curve there.
        let at_ti = fit.yintercept + fit.slope * m.ti;
        assert!((at_ti - m.predict(m.ti)).abs() < 1e-9);
    }

    #[test]
    fn flat_series_cannot_be_seeded() {
        let t: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y = vec![0.0; 20];
        assert!(fit_gompertz(&t, &y, &LmParams::default()).is_none());
    }

    #[test]
    fn regression_of_a_line() {
        let (k, s) = linear_regression(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
        assert!((k - 1.0).abs() < 1e-12 && (s - 2.0).abs() < 1e-12);
        assert!(linear_regression(&[1.0, 1.0], &[0.0, 1.0]).is_none());
    }
}

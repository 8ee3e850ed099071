//! Degree-4 polynomial fit of lesion area and the latency metrics read off it.
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

pub const DEGREE: usize = 4;

/// Spacing of the latency scan grid, in (scaled) time units.
pub const SCAN_STEP: f64 = 0.5;

/// Least-squares polynomial of `degree`, coefficients highest power first,
/// plus the residual sum of squares.
///
/// `x` is rescaled to `[-1, 1]`-ish magnitudes before the SVD solve and the
/// coefficients are mapped back afterwards.
pub fn polyfit(x: &[f64], y: &[f64], degree: usize) -> Option<(Vec<f64>, f64)> {
    let n = x.len();
    if n != y.len() || n <= degree {
        return None;
    }
    let scale = x.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let a = DMatrix::from_fn(n, degree + 1, |i, j| (x[i] / scale).powi((degree - j) as i32));
    let b = DVector::from_column_slice(y);
    let solution = a.clone().svd(true, true).solve(&b, 1e-12).ok()?;
    let coefs: Vec<f64> = solution
        .iter()
        .enumerate()
        .map(|(j, c)| c / scale.powi((degree - j) as i32))
        .collect();
    let residual = (a * solution - b).norm_squared();
    coefs
        .iter()
        .all(|c| c.is_finite())
        .then_some((coefs, residual))
}

/// Horner evaluation, coefficients highest power first.
pub fn polyval(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().fold(0.0, |acc, c| acc * x + c)
}

/// Latency metrics read off a fitted curve.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Latency {
    /// `tau_2ft - tau_ft`.
    pub ldt: f64,
    /// `tau_2ft`.
    pub latency: f64,
}

/// Scan `curve` on `0, 0.5, 1, …` below `t_end`.
///
/// `tau_ft` is the last grid point before the curve first crosses `ft`
/// upwards and `tau_2ft` the last one before it crosses `2·ft`, where the
/// scan stops. If `2·ft` is never crossed both metrics are 0.
pub fn latency_from_curve(curve: impl Fn(f64) -> f64, t_end: f64, ft: f64) -> Latency {
    let grid: Vec<f64> = (0..)
        .map(|i| i as f64 * SCAN_STEP)
        .take_while(|&t| t < t_end)
        .collect();
    let ys: Vec<f64> = grid.iter().map(|&t| curve(t)).collect();
    let mut tau_ft = None;
    for i in 0..ys.len().saturating_sub(1) {
        if tau_ft.is_none() && ys[i] < ft && ys[i + 1] >= ft {
            tau_ft = Some(grid[i]);
        }
        if ys[i] < 2.0 * ft && ys[i + 1] >= 2.0 * ft {
            let tau_2ft = grid[i];
            return Latency {
                ldt: tau_2ft - tau_ft.unwrap_or(0.0),
                latency: tau_2ft,
            };
        }
    }
    Latency::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_curve_latency() {
        let step = |t: f64| {
            if t <= 10.0 {
                0.0
            } else if t <= 20.0 {
                300.0
            } else {
                600.0
            }
        };
        let lat = latency_from_curve(step, 30.0, 300.0);
        assert_eq!(lat.ldt, 10.0);
        assert_eq!(lat.latency, 20.0);
    }

    #[test]
    fn never_reaching_twice_the_threshold_gives_zero() {
        let lat = latency_from_curve(|t| 10.0 * t, 50.0, 300.0);
        assert_eq!(lat, Latency::default());
    }

    #[test]
    fn polyfit_recovers_a_quartic() {
        let truth = [0.001, -0.05, 0.3, 2.0, 5.0];
        let x: Vec<f64> = (0..40).map(|i| i as f64 * 2.5).collect();
        let y: Vec<f64> = x.iter().map(|&v| polyval(&truth, v)).collect();
        let (coefs, residual) = polyfit(&x, &y, DEGREE).unwrap();
        for (c, t) in coefs.iter().zip(truth) {
            assert!((c - t).abs() < 1e-6 * t.abs().max(1.0), "{c} vs {t}");
        }
        assert!(residual < 1e-6);
    }

    #[test]
    fn too_few_points() {
        assert!(polyfit(&[0.0, 1.0, 2.0], &[1.0, 2.0, 3.0], DEGREE).is_none());
    }
}

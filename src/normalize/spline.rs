//! Smooth background surfaces: a tensor-product cubic B-spline on a uniform
//! knot grid, fitted by penalised least squares.
//!
//! The fit is done on the residuals around the mean of the samples, so a
//! constant background is reproduced exactly whatever the sample layout.
use log::debug;
use nalgebra::DMatrix;

/// One scattered sample `(row, col)` with a value per channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSample {
    pub row: f64,
    pub col: f64,
    pub values: [f64; 3],
}

/// Three channel surfaces sharing one knot grid.
#[derive(Clone, Debug)]
pub struct SplineSurface {
    height: f64,
    width: f64,
    segs_r: usize,
    segs_c: usize,
    mean: [f64; 3],
    /// `(segs_r + 3) * (segs_c + 3)` rows, one column per channel.
    coefs: DMatrix<f64>,
}

/// Cubic uniform B-spline weights for fractional offset `f` in `[0, 1)`.
#[inline]
fn basis(f: f64) -> [f64; 4] {
    let f2 = f * f;
    let f3 = f2 * f;
    [
        (1.0 - f).powi(3) / 6.0,
        (3.0 * f3 - 6.0 * f2 + 4.0) / 6.0,
        (-3.0 * f3 + 3.0 * f2 + 3.0 * f + 1.0) / 6.0,
        f3 / 6.0,
    ]
}

/// Segment index and fractional offset of `x` on `[0, extent]` split into `segs`.
#[inline]
fn locate(x: f64, extent: f64, segs: usize) -> (usize, f64) {
    let u = if extent > 0.0 {
        (x / extent).clamp(0.0, 1.0) * segs as f64
    } else {
        0.0
    };
    let seg = (u.floor() as usize).min(segs - 1);
    (seg, u - seg as f64)
}

/// Knot segments per axis for `n` samples.
fn segments_for(n: usize) -> usize {
    (((n as f64).sqrt() / 3.0).floor() as usize).clamp(1, 8)
}

impl SplineSurface {
    /// Fit surfaces over `[0, height] × [0, width]`.
    ///
    /// `smoothing` scales the second-difference roughness penalty. Returns
    /// `None` when there are no samples.
    pub fn fit(samples: &[SurfaceSample], height: f64, width: f64, smoothing: f64) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mut mean = [0.0; 3];
        for s in samples {
            for (m, v) in mean.iter_mut().zip(s.values) {
                *m += v / n;
            }
        }

        let segs = segments_for(samples.len());
        let (segs_r, segs_c) = (segs, segs);
        let (nr, nc) = (segs_r + 3, segs_c + 3);
        let m = nr * nc;

        let mut normal = DMatrix::<f64>::zeros(m, m);
        let mut rhs = DMatrix::<f64>::zeros(m, 3);
        for s in samples {
            let (sr, fr) = locate(s.row, height, segs_r);
            let (sc, fc) = locate(s.col, width, segs_c);
            let (br, bc) = (basis(fr), basis(fc));
            let mut idx = [0usize; 16];
            let mut wts = [0.0f64; 16];
            for a in 0..4 {
                for b in 0..4 {
                    idx[a * 4 + b] = (sr + a) * nc + sc + b;
                    wts[a * 4 + b] = br[a] * bc[b];
                }
            }
            for p in 0..16 {
                for q in 0..16 {
                    normal[(idx[p], idx[q])] += wts[p] * wts[q];
                }
                for ch in 0..3 {
                    rhs[(idx[p], ch)] += wts[p] * (s.values[ch] - mean[ch]);
                }
            }
        }

        let lambda = smoothing * n / m as f64;
        add_second_difference_penalty(&mut normal, nr, nc, lambda);
        for i in 0..m {
            normal[(i, i)] += 1e-9;
        }

        let coefs = match normal.clone().cholesky() {
            Some(chol) => chol.solve(&rhs),
            None => {
                debug!("spline normal equations not positive definite; using LU");
                match normal.lu().solve(&rhs) {
                    Some(c) => c,
                    None => DMatrix::zeros(m, 3),
                }
            }
        };

        Some(Self {
            height,
            width,
            segs_r,
            segs_c,
            mean,
            coefs,
        })
    }

    /// Evaluate every channel at `(row, col)`.
    pub fn eval(&self, row: f64, col: f64) -> [f64; 3] {
        let nc = self.segs_c + 3;
        let (sr, fr) = locate(row, self.height, self.segs_r);
        let (sc, fc) = locate(col, self.width, self.segs_c);
        let (br, bc) = (basis(fr), basis(fc));
        let mut out = self.mean;
        for (a, wr) in br.iter().enumerate() {
            for (b, wc) in bc.iter().enumerate() {
                let k = (sr + a) * nc + sc + b;
                let w = wr * wc;
                for (ch, o) in out.iter_mut().enumerate() {
                    *o += w * self.coefs[(k, ch)];
                }
            }
        }
        out
    }
}

/// Add `lambda · DᵀD` for second differences along both grid axes.
fn add_second_difference_penalty(normal: &mut DMatrix<f64>, nr: usize, nc: usize, lambda: f64) {
    if lambda <= 0.0 {
        return;
    }
    let mut add = |ids: [usize; 3]| {
        let d = [1.0, -2.0, 1.0];
        for p in 0..3 {
            for q in 0..3 {
                normal[(ids[p], ids[q])] += lambda * d[p] * d[q];
            }
        }
    };
    for r in 0..nr {
        for c in 1..nc.saturating_sub(1) {
            add([r * nc + c - 1, r * nc + c, r * nc + c + 1]);
        }
    }
    for c in 0..nc {
        for r in 1..nr.saturating_sub(1) {
            add([(r - 1) * nc + c, r * nc + c, (r + 1) * nc + c]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(height: usize, width: usize, step: usize, f: impl Fn(f64, f64) -> [f64; 3]) -> Vec<SurfaceSample> {
        let mut out = Vec::new();
        for r in (0..height).step_by(step) {
            for c in (0..width).step_by(step) {
                let (row, col) = (r as f64 + step as f64 / 2.0, c as f64 + step as f64 / 2.0);
                out.push(SurfaceSample {
                    row,
                    col,
                    values: f(row, col),
                });
            }
        }
        out
    }

    #[test]
    fn basis_is_partition_of_unity() {
        for f in [0.0, 0.25, 0.5, 0.9] {
            assert!((basis(f).iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn constant_is_reproduced_exactly() {
        let samples = grid(100, 80, 10, |_, _| [0.8, 0.6, 0.4]);
        let s = SplineSurface::fit(&samples, 100.0, 80.0, 0.1).unwrap();
        for (r, c) in [(0.0, 0.0), (50.0, 40.0), (99.0, 79.0)] {
            let v = s.eval(r, c);
            assert!((v[0] - 0.8).abs() < 1e-9);
            assert!((v[2] - 0.4).abs() < 1e-9);
        }
        let single = SplineSurface::fit(&samples[..1], 100.0, 80.0, 0.1).unwrap();
        assert!((single.eval(90.0, 10.0)[1] - 0.6).abs() < 1e-9);
    }

    #[test]
    fn smooth_gradient_is_followed() {
        let samples = grid(120, 120, 10, |r, c| {
            let v = 0.5 + 0.3 * r / 120.0 + 0.1 * c / 120.0;
            [v, v, v]
        });
        let s = SplineSurface::fit(&samples, 120.0, 120.0, 0.1).unwrap();
        for (r, c) in [(20.0, 20.0), (60.0, 90.0), (100.0, 30.0)] {
            let expected = 0.5 + 0.3 * r / 120.0 + 0.1 * c / 120.0;
            assert!((s.eval(r, c)[0] - expected).abs() < 0.01, "{r} {c}");
        }
    }

    #[test]
    fn no_samples_no_surface() {
        assert!(SplineSurface::fit(&[], 10.0, 10.0, 0.1).is_none());
    }
}

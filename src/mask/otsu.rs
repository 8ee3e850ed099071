//! Histogram thresholding: Otsu (two classes) and multi-Otsu (three classes).
//!
//! Both operate on a 256-bin histogram spanning `[min, max]` of the valid
//! pixels; returned thresholds are bin centres. A histogram with fewer
//! occupied bins than classes cannot be split and yields [`LowContrast`].
use crate::error::LowContrast;
use crate::image::{ImageF32, Mask};

pub const NBINS: usize = 256;

#[derive(Clone, Debug)]
pub struct Histogram {
    pub counts: Vec<u64>,
    pub centers: Vec<f64>,
}

impl Histogram {
    /// Histogram of `img`, restricted to pixels set in `valid` when given.
    pub fn from_image(img: &ImageF32, valid: Option<&Mask>) -> Option<Self> {
        let values = || {
            img.data
                .iter()
                .enumerate()
                .filter(move |(i, v)| v.is_finite() && valid.map_or(true, |m| m.data()[*i]))
                .map(|(_, &v)| v as f64)
        };
        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for v in values() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if lo > hi {
            return None;
        }
        let width = (hi - lo) / NBINS as f64;
        let mut counts = vec![0u64; NBINS];
        for v in values() {
            let bin = if width > 0.0 {
                (((v - lo) / width) as usize).min(NBINS - 1)
            } else {
                0
            };
            counts[bin] += 1;
        }
        let centers = (0..NBINS)
            .map(|i| lo + width * (i as f64 + 0.5))
            .collect();
        Some(Self { counts, centers })
    }

    pub fn occupied_bins(&self) -> usize {
        self.counts.iter().filter(|&&c| c > 0).count()
    }

    fn require(hist: Option<&Self>, classes: usize) -> Result<&Self, LowContrast> {
        let occupied_bins = hist.map_or(0, Histogram::occupied_bins);
        match hist {
            Some(h) if occupied_bins >= classes => Ok(h),
            _ => Err(LowContrast {
                occupied_bins,
                classes,
            }),
        }
    }

    /// Prefix sums of counts and of `count * center`.
    fn prefix_sums(&self) -> (Vec<f64>, Vec<f64>) {
        let mut p = Vec::with_capacity(NBINS + 1);
        let mut s = Vec::with_capacity(NBINS + 1);
        p.push(0.0);
        s.push(0.0);
        for (c, x) in self.counts.iter().zip(self.centers.iter()) {
            p.push(p[p.len() - 1] + *c as f64);
            s.push(s[s.len() - 1] + *c as f64 * x);
        }
        (p, s)
    }
}

/// Between-class term `w · μ²` for bins `[a, b)`.
#[inline]
fn class_term(p: &[f64], s: &[f64], a: usize, b: usize) -> f64 {
    let w = p[b] - p[a];
    if w <= 0.0 {
        return 0.0;
    }
    let m = s[b] - s[a];
    m * m / w
}

/// Otsu threshold of the valid pixels of `img`.
pub fn otsu_threshold(img: &ImageF32, valid: Option<&Mask>) -> Result<f64, LowContrast> {
    let hist = Histogram::from_image(img, valid);
    let hist = Histogram::require(hist.as_ref(), 2)?;
    let (p, s) = hist.prefix_sums();
    let mut best = (f64::NEG_INFINITY, 0usize);
    for i in 0..NBINS - 1 {
        let score = class_term(&p, &s, 0, i + 1) + class_term(&p, &s, i + 1, NBINS);
        if score > best.0 {
            best = (score, i);
        }
    }
    Ok(hist.centers[best.1])
}

/// Two thresholds splitting the valid pixels of `img` into three classes.
pub fn multi_otsu_thresholds(
    img: &ImageF32,
    valid: Option<&Mask>,
) -> Result<[f64; 2], LowContrast> {
    let hist = Histogram::from_image(img, valid);
    let hist = Histogram::require(hist.as_ref(), 3)?;
    let (p, s) = hist.prefix_sums();
    let mut best = (f64::NEG_INFINITY, 0usize, 1usize);
    for i in 0..NBINS - 2 {
        let first = class_term(&p, &s, 0, i + 1);
        for j in i + 1..NBINS - 1 {
            let score =
                first + class_term(&p, &s, i + 1, j + 1) + class_term(&p, &s, j + 1, NBINS);
            if score > best.0 {
                best = (score, i, j);
            }
        }
    }
    Ok([hist.centers[best.1], hist.centers[best.2]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_level(w: usize, h: usize, lo: f32, hi: f32) -> ImageF32 {
        let mut img = ImageF32::filled(w, h, lo);
        for y in 0..h {
            for x in w / 2..w {
                img.set(x, y, hi);
            }
        }
        img
    }

    #[test]
    fn otsu_splits_bimodal_image() {
        let img = two_level(10, 4, 0.2, 0.8);
        let t = otsu_threshold(&img, None).unwrap();
        assert!(t >= 0.2 && t < 0.8, "threshold {t}");
    }

    #[test]
    fn constant_image_is_low_contrast() {
        let img = ImageF32::filled(8, 8, 0.5);
        let err = otsu_threshold(&img, None).unwrap_err();
        assert_eq!(err.occupied_bins, 1);
        assert!(multi_otsu_thresholds(&img, None).is_err());
    }

    #[test]
    fn multi_otsu_needs_three_levels() {
        let img = two_level(10, 4, 0.2, 0.8);
        assert_eq!(
            multi_otsu_thresholds(&img, None).unwrap_err(),
            LowContrast {
                occupied_bins: 2,
                classes: 3
            }
        );

        let mut three = two_level(12, 3, 0.1, 0.9);
        for y in 0..3 {
            for x in 4..8 {
                three.set(x, y, 0.5);
            }
        }
        let [t0, t1] = multi_otsu_thresholds(&three, None).unwrap();
        assert!(t0 >= 0.1 && t0 < 0.45, "t0 {t0}");
        assert!(t1 > 0.45 && t1 < 0.9, "t1 {t1}");
    }

    #[test]
    fn invalid_pixels_are_ignored() {
        let img = two_level(10, 2, 0.2, 0.8);
        let valid = Mask::from_fn(10, 2, |x, _| x < 5);
        assert!(otsu_threshold(&img, Some(&valid)).is_err());
    }
}

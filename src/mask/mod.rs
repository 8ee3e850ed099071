//! Foreground/background segmentation of leaf crops.
//!
//! Each [`MaskKind`] maps to exactly one handler. Handlers are pure functions
//! from a crop to a mask of identical spatial shape; only the Otsu-based ones
//! can fail, and only with [`LowContrast`]. [`leaf_mask`] wraps a handler with
//! the quantification post-processing: low-contrast recovery, edge erosion and
//! exclude-zone clearing.
//!
//! Handlers:
//! - `threshold`: saturation ≥ t → close → fill holes → drop small objects → dilate.
//! - `otsu`: grayscale Otsu, darker side by default → close → fill holes → dilate.
//! - `watershed`: multi-Otsu markers flooded over the Sobel elevation map.
//! - `original`: saturation ≥ t, nothing else.
//! - `none`: everything is foreground.

pub mod morph;
pub mod otsu;
pub mod watershed;

use crate::error::{ConfigError, LowContrast};
use crate::image::{Mask, RgbView};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Segmentation algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskKind {
    Threshold,
    Otsu,
    #[default]
    Watershed,
    Original,
    None,
}

impl MaskKind {
    pub const ALL: [MaskKind; 5] = [
        MaskKind::Threshold,
        MaskKind::Otsu,
        MaskKind::Watershed,
        MaskKind::Original,
        MaskKind::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MaskKind::Threshold => "threshold",
            MaskKind::Otsu => "otsu",
            MaskKind::Watershed => "watershed",
            MaskKind::Original => "original",
            MaskKind::None => "none",
        }
    }

    /// Erosion iterations applied by [`leaf_mask`] unless overridden.
    pub fn default_erosion(self) -> usize {
        match self {
            MaskKind::Otsu | MaskKind::Watershed | MaskKind::None => 2,
            MaskKind::Threshold | MaskKind::Original => 0,
        }
    }
}

impl fmt::Display for MaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MaskKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        MaskKind::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| ConfigError::UnknownMaskKind(s.to_string()))
    }
}

/// Which side of the Otsu threshold is foreground.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtsuPolarity {
    /// `gray <= t`: leaves photographed on a bright backdrop.
    #[default]
    Darker,
    /// `gray > t`.
    Brighter,
}

/// Knobs shared by every handler; unused fields are ignored per kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskParams {
    pub kind: MaskKind,
    /// Saturation cut for `threshold` and `original`.
    pub saturation_threshold: f32,
    /// Minimum component size kept by `threshold`.
    pub threshold_min_object_size: usize,
    /// Minimum component size kept by `watershed`.
    pub min_object_size: usize,
    /// Erosion iterations; `None` uses [`MaskKind::default_erosion`].
    pub erode: Option<usize>,
    pub otsu_polarity: OtsuPolarity,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            kind: MaskKind::default(),
            saturation_threshold: 0.3,
            threshold_min_object_size: 50,
            min_object_size: 500,
            erode: None,
            otsu_polarity: OtsuPolarity::default(),
        }
    }
}

impl MaskParams {
    pub fn with_kind(kind: MaskKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_erosion(mut self, iterations: usize) -> Self {
        self.erode = Some(iterations);
        self
    }

    pub fn erosion(&self) -> usize {
        self.erode.unwrap_or_else(|| self.kind.default_erosion())
    }
}

/// Run the handler selected by `params.kind` with no post-processing.
pub fn foreground_mask(view: &RgbView<'_>, params: &MaskParams) -> Result<Mask, LowContrast> {
    match params.kind {
        MaskKind::Threshold => Ok(threshold_mask(
            view,
            params.saturation_threshold,
            params.threshold_min_object_size,
        )),
        MaskKind::Otsu => otsu_mask(view, params.otsu_polarity),
        MaskKind::Watershed => watershed_mask(view, params.min_object_size),
        MaskKind::Original => Ok(original_mask(view, params.saturation_threshold)),
        MaskKind::None => Ok(Mask::full(view.w, view.h, true)),
    }
}

pub fn threshold_mask(view: &RgbView<'_>, threshold: f32, min_object_size: usize) -> Mask {
    let mask = original_mask(view, threshold);
    let mask = morph::close3x3(&mask);
    let mask = morph::fill_holes(&mask);
    let mask = morph::remove_small_objects(&mask, min_object_size);
    morph::dilate3x3(&mask)
}

pub fn original_mask(view: &RgbView<'_>, threshold: f32) -> Mask {
    let sat = view.to_saturation();
    Mask::from_fn(view.w, view.h, |x, y| {
        view.is_valid(x, y) && sat.get(x, y) >= threshold
    })
}

pub fn otsu_mask(view: &RgbView<'_>, polarity: OtsuPolarity) -> Result<Mask, LowContrast> {
    let gray = view.to_gray();
    let valid = view.validity();
    let t = otsu::otsu_threshold(&gray, valid.as_ref())? as f32;
    let mask = Mask::from_fn(view.w, view.h, |x, y| {
        let v = gray.get(x, y);
        !view.is_valid(x, y)
            || match polarity {
                OtsuPolarity::Darker => v <= t,
                OtsuPolarity::Brighter => v > t,
            }
    });
    let mask = morph::close3x3(&mask);
    let mask = morph::fill_holes(&mask);
    Ok(morph::dilate3x3(&mask))
}

pub fn watershed_mask(view: &RgbView<'_>, min_object_size: usize) -> Result<Mask, LowContrast> {
    const DARK: u8 = 1;
    const BRIGHT: u8 = 2;

    let gray = view.to_gray();
    let valid = view.validity();
    let [t0, t1] = otsu::multi_otsu_thresholds(&gray, valid.as_ref())?;
    let elevation = crate::edges::sobel_magnitude(&gray);
    let markers: Vec<u8> = gray
        .data
        .iter()
        .map(|&v| {
            let v = v as f64;
            if v < t0 {
                DARK
            } else if v > t1 {
                BRIGHT
            } else {
                0
            }
        })
        .collect();
    let labels = watershed::watershed(&elevation, &markers);
    let dark = Mask::from_vec(view.w, view.h, labels.iter().map(|&l| l == DARK).collect())
        .unwrap_or_else(|_| Mask::new(view.w, view.h));
    let mut mask = morph::remove_small_objects(&morph::fill_holes(&dark), min_object_size);
    if valid.is_some() {
        for y in 0..view.h {
            for x in 0..view.w {
                if !view.is_valid(x, y) {
                    mask.set(x, y, true);
                }
            }
        }
    }
    Ok(mask)
}

/// Mask produced for quantification, with the low-contrast flag.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskOutcome {
    pub mask: Mask,
    /// The handler hit [`LowContrast`] and the crop was taken as all foreground.
    pub low_contrast: bool,
}

/// Mask for quantifying one leaf crop.
///
/// On [`LowContrast`] the whole crop becomes foreground, erosion is skipped
/// and a warning naming `id` is logged. Exclude pixels are cleared last,
/// whatever path produced the mask.
pub fn leaf_mask(
    view: &RgbView<'_>,
    params: &MaskParams,
    exclude: Option<&Mask>,
    id: &str,
) -> MaskOutcome {
    let (mut mask, low_contrast) = match foreground_mask(view, params) {
        Ok(mask) => (morph::erode_iterations(&mask, params.erosion()), false),
        Err(err) => {
            warn!("while processing sample {id}: {err}; using the whole crop as foreground");
            (Mask::full(view.w, view.h, true), true)
        }
    };
    if let Some(exclude) = exclude {
        mask.subtract(exclude);
    }
    MaskOutcome { mask, low_contrast }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{ImageView, RgbImage};
    use crate::types::Rect;

    const BACKDROP: [f32; 3] = [0.92, 0.92, 0.9];
    const GREEN: [f32; 3] = [0.2, 0.55, 0.15];

    fn blend(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
        [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0, (a[2] + b[2]) / 2.0]
    }

    /// Green disc with a soft rim on a pale backdrop.
    fn leaf_crop(size: usize, radius: f32) -> RgbImage {
        let c = size as f32 / 2.0;
        let mut img = RgbImage::filled(size, size, BACKDROP);
        for y in 0..size {
            for x in 0..size {
                let (dx, dy) = (x as f32 + 0.5 - c, y as f32 + 0.5 - c);
                let d = (dx * dx + dy * dy).sqrt();
                if d <= radius {
                    img.set(x, y, GREEN);
                } else if d <= radius + 1.5 {
                    img.set(x, y, blend(GREEN, BACKDROP));
                }
            }
        }
        img
    }

    #[test]
    fn mask_kind_parses_case_insensitively() {
        assert_eq!("Otsu".parse::<MaskKind>().unwrap(), MaskKind::Otsu);
        assert_eq!("none".parse::<MaskKind>().unwrap(), MaskKind::None);
        assert!(matches!(
            "kmeans".parse::<MaskKind>(),
            Err(ConfigError::UnknownMaskKind(_))
        ));
    }

    #[test]
    fn every_kind_preserves_shape() {
        let img = leaf_crop(40, 12.0);
        let view = img.crop(&Rect {
            minr: 3,
            minc: 1,
            maxr: 38,
            maxc: 30,
        });
        for kind in MaskKind::ALL {
            let params = MaskParams {
                min_object_size: 20,
                ..MaskParams::with_kind(kind)
            };
            let out = leaf_mask(&view, &params, None, "shape");
            assert_eq!(out.mask.shape(), view.shape(), "kind {kind}");
        }
    }

    #[test]
    fn segmenters_find_the_disc() {
        let img = leaf_crop(48, 14.0);
        let view = img.as_view();
        let disc = (std::f32::consts::PI * 14.0 * 14.0) as usize;
        for kind in [
            MaskKind::Threshold,
            MaskKind::Otsu,
            MaskKind::Watershed,
            MaskKind::Original,
        ] {
            let params = MaskParams {
                min_object_size: 50,
                ..MaskParams::with_kind(kind)
            };
            let mask = foreground_mask(&view, &params).unwrap();
            assert!(mask.get(24, 24), "kind {kind} misses the centre");
            assert!(!mask.get(1, 1), "kind {kind} marks the corner");
            let n = mask.count();
            assert!(
                n > disc / 2 && n < disc * 2,
                "kind {kind} area {n} vs disc {disc}"
            );
        }
    }

    #[test]
    fn invalid_pixels_are_forced_into_the_mask() {
        let mut valid = Mask::full(48, 48, true);
        for y in 0..3 {
            for x in 0..3 {
                valid.set(x, y, false);
            }
        }
        let img = leaf_crop(48, 14.0).with_validity(&valid).unwrap();
        let view = img.as_view();
        for kind in [MaskKind::Watershed, MaskKind::Otsu] {
            let params = MaskParams {
                min_object_size: 50,
                ..MaskParams::with_kind(kind)
            };
            let mask = foreground_mask(&view, &params).unwrap();
            for y in 0..3 {
                for x in 0..3 {
                    assert!(mask.get(x, y), "kind {kind} drops invalid ({x}, {y})");
                }
            }
            assert!(mask.get(24, 24), "kind {kind} misses the centre");
            assert!(!mask.get(46, 46), "kind {kind} marks the far corner");
        }
    }

    #[test]
    fn low_contrast_falls_back_to_full_mask_without_erosion() {
        let img = RgbImage::filled(12, 10, GREEN);
        let view = img.as_view();
        for kind in [MaskKind::Otsu, MaskKind::Watershed] {
            let params = MaskParams::with_kind(kind);
            assert!(foreground_mask(&view, &params).is_err());
            let out = leaf_mask(&view, &params, None, "flat");
            assert!(out.low_contrast);
            assert!(out.mask.all());
        }
    }

    #[test]
    fn none_is_all_true_before_erosion() {
        let img = leaf_crop(10, 3.0);
        let params = MaskParams::with_kind(MaskKind::None);
        assert!(foreground_mask(&img.as_view(), &params).unwrap().all());
        let out = leaf_mask(&img.as_view(), &params, None, "none");
        assert_eq!(out.mask.count(), 6 * 6);
    }

    #[test]
    fn exclusion_is_applied_after_low_contrast_recovery() {
        let img = RgbImage::filled(8, 8, GREEN);
        let mut exclude = Mask::new(8, 8);
        exclude.fill_rect(
            &Rect {
                minr: 0,
                minc: 0,
                maxr: 2,
                maxc: 8,
            },
            true,
        );
        let out = leaf_mask(
            &img.as_view(),
            &MaskParams::with_kind(MaskKind::Otsu),
            Some(&exclude),
            "excl",
        );
        assert!(out.low_contrast);
        assert_eq!(out.mask.count(), 48);
    }

    #[test]
    fn brighter_polarity_selects_the_backdrop() {
        // Dark left half, pale right half: neither side encloses the other.
        let mut img = RgbImage::filled(20, 10, BACKDROP);
        for y in 0..10 {
            for x in 0..10 {
                img.set(x, y, GREEN);
            }
        }
        let params = MaskParams {
            otsu_polarity: OtsuPolarity::Brighter,
            ..MaskParams::with_kind(MaskKind::Otsu)
        };
        let mask = foreground_mask(&img.as_view(), &params).unwrap();
        assert!(mask.get(19, 0));
        assert!(!mask.get(0, 0));

        let darker = foreground_mask(&img.as_view(), &MaskParams::with_kind(MaskKind::Otsu)).unwrap();
        assert!(darker.get(0, 0));
        assert!(!darker.get(19, 0));
    }
}

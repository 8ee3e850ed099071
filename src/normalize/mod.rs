//! Background colour normalisation of whole panel photographs.
//!
//! Background pixels are those outside the foreground mask, inside the layout
//! grid and outside every exclude zone. The image is divided by a background
//! estimate per channel, clipped to `[0, 1]` and quantised to 8-bit levels:
//! - [`correct_uniform`]: one median colour for the whole panel;
//! - [`correct_nonuniform`]: a smooth surface fitted on tile means.
pub mod spline;

use crate::error::LowContrast;
use crate::image::{unit_to_u8, ImageView, Mask, Rgb, RgbImage};
use crate::mask::{foreground_mask, MaskParams};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use spline::{SplineSurface, SurfaceSample};

/// Which correction a batch applies before quantification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    #[default]
    None,
    Uniform,
    Nonuniform,
}

/// What to do when background detection hits [`LowContrast`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContrastPolicy {
    /// Warn and quantify the uncorrected panel.
    #[default]
    Uncorrected,
    /// Fail the frame.
    Abort,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeParams {
    pub mode: Normalization,
    /// Side of the square tiles averaged for the nonuniform surface.
    pub tile_size: usize,
    /// Tiles with a larger share of non-background pixels are dropped.
    pub max_missing: f64,
    /// Roughness penalty of the nonuniform surface.
    pub smoothing: f64,
    pub on_low_contrast: ContrastPolicy,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            mode: Normalization::None,
            tile_size: 10,
            max_missing: 0.5,
            smoothing: 0.1,
            on_low_contrast: ContrastPolicy::Uncorrected,
        }
    }
}

/// Pixels usable for background estimation.
pub fn background_mask(
    img: &RgbImage,
    grid: &Mask,
    exclude: &Mask,
    params: &MaskParams,
) -> Result<Mask, LowContrast> {
    let mut background = foreground_mask(&img.as_view(), params)?;
    background.invert();
    for (i, v) in background.data_mut().iter_mut().enumerate() {
        *v = *v && grid.data()[i] && !exclude.data()[i];
    }
    for y in 0..img.height() {
        for x in 0..img.width() {
            if !img.is_valid(x, y) {
                background.set(x, y, false);
            }
        }
    }
    debug!(
        "background: {} of {} px usable",
        background.count(),
        img.width() * img.height()
    );
    Ok(background)
}

/// Divide by a single median background colour.
pub fn correct_uniform(
    img: &RgbImage,
    grid: &Mask,
    exclude: &Mask,
    params: &MaskParams,
) -> Result<RgbImage, LowContrast> {
    let background = background_mask(img, grid, exclude, params)?;
    let estimate = median_background(img, &background).unwrap_or_else(|| {
        warn!("no background pixels available; leaving colours uncorrected");
        [1.0; 3]
    });
    debug!("uniform background estimate {estimate:?}");
    Ok(apply_background(img, |_, _| estimate))
}

/// Divide by a smooth per-channel background surface.
pub fn correct_nonuniform(
    img: &RgbImage,
    grid: &Mask,
    exclude: &Mask,
    mask: &MaskParams,
    params: &NormalizeParams,
) -> Result<RgbImage, LowContrast> {
    let background = background_mask(img, grid, exclude, mask)?;
    let samples = tile_means(img, &background, params.tile_size.max(1), params.max_missing);
    let surface = SplineSurface::fit(
        &samples,
        img.height() as f64,
        img.width() as f64,
        params.smoothing,
    );
    match surface {
        Some(surface) => {
            debug!("nonuniform background from {} tiles", samples.len());
            Ok(apply_background(img, |x, y| {
                let v = surface.eval(y as f64, x as f64);
                [
                    v[0].clamp(0.0, 1.0) as f32,
                    v[1].clamp(0.0, 1.0) as f32,
                    v[2].clamp(0.0, 1.0) as f32,
                ]
            }))
        }
        None => {
            warn!("no background tile survived; leaving colours uncorrected");
            Ok(apply_background(img, |_, _| [1.0; 3]))
        }
    }
}

/// Per-channel median over `background`; even counts average the middle pair.
fn median_background(img: &RgbImage, background: &Mask) -> Option<Rgb> {
    let mut channels: [Vec<f32>; 3] = Default::default();
    for (px, _) in img
        .pixels()
        .iter()
        .zip(background.data())
        .filter(|(_, &b)| b)
    {
        for (c, v) in channels.iter_mut().zip(px) {
            c.push(*v);
        }
    }
    if channels[0].is_empty() {
        return None;
    }
    let mut out = [0.0; 3];
    for (o, values) in out.iter_mut().zip(channels.iter_mut()) {
        values.sort_by(|a, b| a.total_cmp(b));
        let n = values.len();
        *o = if n % 2 == 1 {
            values[n / 2]
        } else {
            (values[n / 2 - 1] + values[n / 2]) / 2.0
        };
    }
    Some(out)
}

/// Means of background pixels over non-overlapping tiles.
///
/// Tiles start every `size` pixels up to `extent - 1`; the sample sits at the
/// integer tile centre.
fn tile_means(img: &RgbImage, background: &Mask, size: usize, max_missing: f64) -> Vec<SurfaceSample> {
    let (w, h) = (img.width(), img.height());
    let mut out = Vec::new();
    for r in (0..h.saturating_sub(1)).step_by(size) {
        for c in (0..w.saturating_sub(1)).step_by(size) {
            let (r1, c1) = ((r + size).min(h), (c + size).min(w));
            let total = (r1 - r) * (c1 - c);
            let mut sum = [0.0f64; 3];
            let mut n = 0usize;
            for y in r..r1 {
                for x in c..c1 {
                    if background.get(x, y) {
                        let px = img.get(x, y);
                        for (s, v) in sum.iter_mut().zip(px) {
                            *s += v as f64;
                        }
                        n += 1;
                    }
                }
            }
            let missing = 1.0 - n as f64 / total as f64;
            if n == 0 || missing > max_missing {
                continue;
            }
            out.push(SurfaceSample {
                row: (r + size / 2) as f64,
                col: (c + size / 2) as f64,
                values: sum.map(|s| s / n as f64),
            });
        }
    }
    out
}

/// `img / background`, clipped and quantised; invalid or zero-background
/// channels map to 1.0.
fn apply_background(img: &RgbImage, background: impl Fn(usize, usize) -> Rgb) -> RgbImage {
    let mut out = RgbImage::filled(img.width(), img.height(), [1.0; 3]);
    let view = img.as_view();
    for y in 0..img.height() {
        for (x, px) in view.row(y).iter().enumerate() {
            if !img.is_valid(x, y) {
                continue;
            }
            let bg = background(x, y);
            let mut corrected = [1.0f32; 3];
            for ch in 0..3 {
                let v = if bg[ch] > 0.0 && bg[ch].is_finite() {
                    (px[ch] / bg[ch]).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                corrected[ch] = unit_to_u8(v) as f32 / 255.0;
            }
            out.set(x, y, corrected);
        }
    }
    out
}

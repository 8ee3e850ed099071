//! Per-leaf colour-rule quantification.
//!
//! A [`Leaf`] borrows its crop from the panel image. [`Leaf::analyze`] computes
//! the foreground mask once and derives every raster from it; [`Leaf::stats`]
//! collapses an analysis into one [`LeafStats`] row.
use crate::image::{ImageF32, ImageView, Mask, RgbView};
use crate::mask::{leaf_mask, MaskKind, MaskParams};
use crate::types::LeafStats;
use log::debug;

/// Default red amplification used by the lesion rule `f·R > G`.
pub const DEFAULT_LESION_FACTOR: f32 = 1.1;

const ICHLORO_C0: f64 = -0.0280 * 1.049_382_716_049_38;
const ICHLORO_C1: f64 = 0.0190 * 1.049_382_716_049_38;
const ICHLORO_C2: f64 = -0.0030 * 1.041_152_263_374_49;
const ICHLORO_OFFSET: f64 = 5.780;

/// Chlorophyll proxy for one pixel with channels in `[0, 1]`, result in `[0, 1]`.
///
/// Channels are taken to the 0-255 scale before the log-linear combination.
/// They are rounded, not truncated, so 8-bit sources map back to their exact
/// byte values after the `/ 255` decode.
pub fn ichloro_pixel(px: [f32; 3]) -> f32 {
    let r = (px[0] as f64 * 255.0).round();
    let g = (px[1] as f64 * 255.0).round();
    let b = (px[2] as f64 * 255.0).round();
    let v = (ICHLORO_C0 * r + ICHLORO_C1 * g + ICHLORO_C2 * b + ICHLORO_OFFSET).exp() / 255.0;
    v.clamp(0.0, 1.0) as f32
}

/// Rasters produced by one analysis pass over a leaf crop.
#[derive(Clone, Debug)]
pub struct LeafAnalysis {
    pub mask: Mask,
    pub lesion: Mask,
    pub healthy: Mask,
    /// Per-pixel ichloro, zero outside the mask.
    pub ichloro: ImageF32,
    /// The mask engine recovered from low contrast.
    pub low_contrast: bool,
}

impl LeafAnalysis {
    /// Masked pixels with `f·R == G`, in neither class.
    pub fn unclassified(&self) -> usize {
        self.mask.count() - self.lesion.count() - self.healthy.count()
    }
}

/// One sample within one frame.
#[derive(Clone, Debug)]
pub struct Leaf<'a> {
    id: String,
    view: RgbView<'a>,
    time: Option<i64>,
    position: Option<(f64, f64)>,
    mask: MaskParams,
    exclude: Option<Mask>,
    lesion_factor: f32,
}

impl<'a> Leaf<'a> {
    pub fn new(id: impl Into<String>, view: RgbView<'a>) -> Self {
        Self {
            id: id.into(),
            view,
            time: None,
            position: None,
            mask: MaskParams::default(),
            exclude: None,
            lesion_factor: DEFAULT_LESION_FACTOR,
        }
    }

    pub fn with_time(mut self, time: Option<i64>) -> Self {
        self.time = time;
        self
    }

    pub fn with_position(mut self, position: Option<(f64, f64)>) -> Self {
        self.position = position;
        self
    }

    pub fn with_mask_params(mut self, params: MaskParams) -> Self {
        self.mask = params;
        self
    }

    /// Pixels (in crop coordinates) cleared from the mask after erosion.
    pub fn with_exclude(mut self, exclude: Option<Mask>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_lesion_factor(mut self, factor: f32) -> Self {
        self.lesion_factor = factor;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn time(&self) -> Option<i64> {
        self.time
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        self.position
    }

    pub fn mask_kind(&self) -> MaskKind {
        self.mask.kind
    }

    pub fn view(&self) -> &RgbView<'a> {
        &self.view
    }

    /// Segment the crop and classify every masked pixel.
    pub fn analyze(&self) -> LeafAnalysis {
        let outcome = leaf_mask(&self.view, &self.mask, self.exclude.as_ref(), &self.id);
        let (w, h) = (self.view.w, self.view.h);
        let mut lesion = Mask::new(w, h);
        let mut healthy = Mask::new(w, h);
        let mut ichloro = ImageF32::new(w, h);
        for y in 0..h {
            for (x, px) in self.view.row(y).iter().enumerate() {
                if !outcome.mask.get(x, y) {
                    continue;
                }
                let red = self.lesion_factor * px[0];
                if red > px[1] {
                    lesion.set(x, y, true);
                } else if red < px[1] {
                    healthy.set(x, y, true);
                }
                ichloro.set(x, y, ichloro_pixel(*px));
            }
        }
        debug!(
            "leaf {}: {} masked px, {} lesion px ({})",
            self.id,
            outcome.mask.count(),
            lesion.count(),
            self.mask.kind
        );
        LeafAnalysis {
            mask: outcome.mask,
            lesion,
            healthy,
            ichloro,
            low_contrast: outcome.low_contrast,
        }
    }

    /// Summarise an analysis of this leaf.
    pub fn stats_from(&self, analysis: &LeafAnalysis) -> LeafStats {
        let lesion_area = analysis.lesion.count() as u64;
        LeafStats {
            id: self.id.clone(),
            lesion_area,
            leaf_area: analysis.healthy.count() as u64 + lesion_area,
            ichloro_sum: analysis.ichloro.sum(),
            mask_area: analysis.mask.count() as u64,
            time: self.time,
            position: self.position,
        }
    }

    pub fn stats(&self) -> LeafStats {
        self.stats_from(&self.analyze())
    }
}

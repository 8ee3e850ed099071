//! One panel photograph paired with its layout.
//!
//! A [`Panel`] owns the image and hands out [`Leaf`] views that borrow from it.
//! Colour correction never mutates the panel: it returns a new one wrapping
//! the corrected image and sharing the same layout.
pub mod layout;

pub use layout::{BoundingBox, Layout, LayoutRow};

use crate::error::LowContrast;
use crate::image::{Mask, RgbImage};
use crate::leaf::{Leaf, DEFAULT_LESION_FACTOR};
use crate::mask::{MaskKind, MaskParams};
use crate::normalize::{self, NormalizeParams};
use crate::types::Rect;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelParams {
    /// Pixels added around every sample box before cropping.
    pub margin: usize,
    /// Segmentation used to quantify leaves.
    pub leaf_mask: MaskParams,
    /// Segmentation used to find background pixels for colour correction.
    pub background_mask: MaskParams,
    pub lesion_factor: f32,
}

impl Default for PanelParams {
    fn default() -> Self {
        Self {
            margin: 5,
            leaf_mask: MaskParams::default(),
            background_mask: MaskParams {
                min_object_size: 500,
                ..MaskParams::with_kind(MaskKind::Otsu)
            },
            lesion_factor: DEFAULT_LESION_FACTOR,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Panel {
    image: RgbImage,
    layout: Arc<Layout>,
    params: PanelParams,
    time: Option<i64>,
    exclude: Mask,
}

impl Panel {
    pub fn new(image: RgbImage, layout: Arc<Layout>, params: PanelParams) -> Self {
        let exclude = exclude_mask_for(&image, &layout);
        Self {
            image,
            layout,
            params,
            time: None,
            exclude,
        }
    }

    pub fn with_time(mut self, time: Option<i64>) -> Self {
        self.time = time;
        self
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn params(&self) -> &PanelParams {
        &self.params
    }

    pub fn time(&self) -> Option<i64> {
        self.time
    }

    /// Leaf for sample `id` with the panel's margin; `kind` overrides the
    /// leaf mask kind. `None` for unknown ids and exclude zones.
    pub fn get(&self, id: &str, kind: Option<MaskKind>) -> Option<Leaf<'_>> {
        self.get_with_margin(id, self.params.margin, kind)
    }

    pub fn get_with_margin(&self, id: &str, margin: usize, kind: Option<MaskKind>) -> Option<Leaf<'_>> {
        let row = self.layout.get(id)?;
        Some(self.leaf_for(row, margin, kind))
    }

    /// Fresh leaves in layout order; exclude zones are skipped.
    pub fn leaves(&self) -> impl Iterator<Item = Leaf<'_>> + '_ {
        self.layout
            .samples()
            .map(move |row| self.leaf_for(row, self.params.margin, None))
    }

    fn leaf_for(&self, row: &LayoutRow, margin: usize, kind: Option<MaskKind>) -> Leaf<'_> {
        let rect = row
            .bbox
            .with_margin(margin, self.image.height(), self.image.width());
        let mut mask = self.params.leaf_mask.clone();
        if let Some(kind) = kind {
            mask.kind = kind;
        }
        let exclude = self.exclude.crop(&rect);
        Leaf::new(row.id.clone(), self.image.crop(&rect))
            .with_time(self.time)
            .with_position(Some(rect.center()))
            .with_mask_params(mask)
            .with_exclude(exclude.any().then_some(exclude))
            .with_lesion_factor(self.params.lesion_factor)
    }

    /// Union of the raw sample boxes, minus exclude zones.
    pub fn grid_mask(&self) -> Mask {
        let (h, w) = (self.image.height(), self.image.width());
        let mut grid = Mask::new(w, h);
        for row in self.layout.samples() {
            grid.fill_rect(&row.bbox.clamped(h, w), true);
        }
        grid.subtract(&self.exclude);
        grid
    }

    /// Pixels covered by any exclude zone.
    pub fn exclude_mask(&self) -> &Mask {
        &self.exclude
    }

    pub fn correct_uniform(&self) -> Result<Panel, LowContrast> {
        let corrected = normalize::correct_uniform(
            &self.image,
            &self.grid_mask(),
            &self.exclude,
            &self.params.background_mask,
        )?;
        Ok(self.rewrap(corrected))
    }

    pub fn correct_nonuniform(&self, params: &NormalizeParams) -> Result<Panel, LowContrast> {
        let corrected = normalize::correct_nonuniform(
            &self.image,
            &self.grid_mask(),
            &self.exclude,
            &self.params.background_mask,
            params,
        )?;
        Ok(self.rewrap(corrected))
    }

    fn rewrap(&self, image: RgbImage) -> Panel {
        Panel {
            image,
            layout: Arc::clone(&self.layout),
            params: self.params.clone(),
            time: self.time,
            exclude: self.exclude.clone(),
        }
    }
}

fn exclude_mask_for(image: &RgbImage, layout: &Layout) -> Mask {
    let (h, w) = (image.height(), image.width());
    let mut mask = Mask::new(w, h);
    for row in layout.excludes() {
        let rect: Rect = row.bbox.clamped(h, w);
        mask.fill_rect(&rect, true);
    }
    mask
}

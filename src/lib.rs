#![doc = include_str!("../README.md")]

// Pipeline modules
pub mod batch;
pub mod config;
pub mod fit;
pub mod leaf;
pub mod normalize;
pub mod panel;

// Building blocks
pub mod diagnostics;
pub mod edges;
pub mod error;
pub mod image;
pub mod mask;
pub mod types;

// --- High-level re-exports -------------------------------------------------

pub use crate::batch::{run_batch, BatchOutput, BatchParams, FileImageSource, Frame, ImageSource};
pub use crate::error::{ConfigError, InfestError, LowContrast, Result};
pub use crate::fit::{fit_all, group_series, FitParams, FitReport};
pub use crate::leaf::{Leaf, LeafAnalysis};
pub use crate::mask::{MaskKind, MaskParams};
pub use crate::normalize::{Normalization, NormalizeParams};
pub use crate::panel::{Layout, Panel, PanelParams};
pub use crate::types::{LeafStats, Rect};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use infest::prelude::*;
/// use std::path::Path;
/// use std::sync::Arc;
///
/// # fn main() -> infest::Result<()> {
/// let layout = Arc::new(Layout::load(Path::new("grid_layout/grid.layout"))?);
/// let image = infest::image::io::load_rgb_image(Path::new("12.jpg"))?;
/// let panel = Panel::new(image, layout, PanelParams::default()).with_time(Some(12));
/// for leaf in panel.leaves() {
///     let stats = leaf.stats();
///     println!("{} lesion={} leaf={}", stats.id, stats.lesion_area, stats.leaf_area);
/// }
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::image::{RgbImage, RgbView};
    pub use crate::{Layout, Leaf, LeafStats, MaskKind, MaskParams, Panel, PanelParams};
}

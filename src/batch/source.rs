//! Where frame pixels come from.
use crate::error::Result;
use crate::image::io::load_rgb_image;
use crate::image::RgbImage;
use std::path::Path;

/// Decodes one frame into RGB in `[0, 1]`. Shared by every worker.
pub trait ImageSource: Sync {
    fn load(&self, path: &Path) -> Result<RgbImage>;
}

/// Decodes files from disk with the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileImageSource;

impl ImageSource for FileImageSource {
    fn load(&self, path: &Path) -> Result<RgbImage> {
        load_rgb_image(path)
    }
}

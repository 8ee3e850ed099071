#![allow(dead_code)]

use infest::batch::ImageSource;
use infest::error::{InfestError, Result};
use infest::image::RgbImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const BACKDROP: [f32; 3] = [0.92, 0.92, 0.9];
pub const GREEN: [f32; 3] = [0.2, 0.55, 0.15];
pub const BROWN: [f32; 3] = [0.5, 0.3, 0.1];

/// A green disc with a concentric brown lesion.
#[derive(Clone, Copy, Debug)]
pub struct LeafDisc {
    pub center: (f32, f32),
    pub radius: f32,
    pub lesion_radius: f32,
}

/// Pale backdrop with the given leaves painted on it.
pub fn panel_image(width: usize, height: usize, leaves: &[LeafDisc]) -> RgbImage {
    let mut img = RgbImage::filled(width, height, BACKDROP);
    for y in 0..height {
        for x in 0..width {
            for leaf in leaves {
                let dx = x as f32 + 0.5 - leaf.center.0;
                let dy = y as f32 + 0.5 - leaf.center.1;
                let d = (dx * dx + dy * dy).sqrt();
                if d <= leaf.lesion_radius {
                    img.set(x, y, BROWN);
                } else if d <= leaf.radius {
                    img.set(x, y, GREEN);
                }
            }
        }
    }
    img
}

pub fn fill(img: &mut RgbImage, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>, px: [f32; 3]) {
    for y in rows {
        for x in cols.clone() {
            img.set(x, y, px);
        }
    }
}

/// Decoded frames served from memory.
#[derive(Default)]
pub struct MemorySource {
    images: HashMap<PathBuf, RgbImage>,
}

impl MemorySource {
    pub fn insert(&mut self, path: impl Into<PathBuf>, image: RgbImage) {
        self.images.insert(path.into(), image);
    }
}

impl ImageSource for MemorySource {
    fn load(&self, path: &Path) -> Result<RgbImage> {
        self.images.get(path).cloned().ok_or_else(|| InfestError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not in memory"),
        })
    }
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("infest-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

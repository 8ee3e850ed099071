//! I/O helpers for panel photographs, review artifacts and JSON reports.
//!
//! - `load_rgb_image`: decode any supported format into an `RgbImage` in `[0, 1]`.
//! - `save_rgb_u8`: write a view as an 8-bit RGB PNG.
//! - `save_mask_u8`: write a boolean raster as a black/white PNG.
//! - `save_grayscale_f32`: write a `[0, 1]` plane to a grayscale PNG.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::{ImageF32, ImageView, Mask, RgbImage, RgbView};
use crate::error::{InfestError, Result};
use image::{GrayImage, ImageBuffer, Luma, Rgb as PixelRgb};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk as RGB floats in `[0, 1]`.
///
/// 8-bit, 16-bit and float sources are all normalised by the decoder.
pub fn load_rgb_image(path: &Path) -> Result<RgbImage> {
    let img = image::open(path)
        .map_err(|source| InfestError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgb32f();
    let width = img.width() as usize;
    let height = img.height() as usize;
    let data = img
        .into_raw()
        .chunks_exact(3)
        .map(|c| [c[0].clamp(0.0, 1.0), c[1].clamp(0.0, 1.0), c[2].clamp(0.0, 1.0)])
        .collect();
    RgbImage::new(width, height, data)
}

/// Save an RGB view as an 8-bit PNG (or any format implied by the extension).
pub fn save_rgb_u8(view: &RgbView<'_>, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let buffer: ImageBuffer<PixelRgb<u8>, Vec<u8>> =
        ImageBuffer::from_raw(view.w as u32, view.h as u32, view.to_u8()).ok_or(
            InfestError::Shape {
                width: view.w,
                height: view.h,
                actual: view.w * view.h,
            },
        )?;
    buffer.save(path).map_err(|source| InfestError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Save a float plane to a grayscale PNG, clamping values in [0, 255].
pub fn save_grayscale_f32(image: &ImageF32, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut out = GrayImage::new(image.w as u32, image.h as u32);
    for y in 0..image.h {
        let row = image.row(y);
        for (x, &px) in row.iter().enumerate() {
            let v = (px * 255.0).clamp(0.0, 255.0);
            out.put_pixel(x as u32, y as u32, Luma([v as u8]));
        }
    }
    out.save(path).map_err(|source| InfestError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Save a boolean raster as 0/255 grayscale.
pub fn save_mask_u8(mask: &Mask, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let mut out = GrayImage::new(mask.width() as u32, mask.height() as u32);
    for y in 0..mask.height() {
        for (x, &v) in mask.row(y).iter().enumerate() {
            out.put_pixel(x as u32, y as u32, Luma([if v { 255 } else { 0 }]));
        }
    }
    out.save(path).map_err(|source| InfestError::Image {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        InfestError::io(path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })?;
    fs::write(path, json).map_err(|e| InfestError::io(path, e))
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| InfestError::io(parent, e))?;
        }
    }
    Ok(())
}

//! Owned RGB raster with channels in `[0, 1]` and an optional validity plane,
//! plus borrowed crop views.
//!
//! Missing data is never encoded as NaN: a pixel is either valid or flagged
//! invalid in the side plane. Crops are non-owning views that keep the parent
//! stride, so a [`RgbView`] cannot outlive the image it was cut from.
use super::{ImageF32, ImageView, Mask};
use crate::error::{InfestError, Result};
use crate::types::Rect;

/// One pixel, `[r, g, b]` in `[0, 1]`.
pub type Rgb = [f32; 3];

/// Luminance weights used for every grayscale conversion (ITU-R 709).
pub const GRAY_WEIGHTS: [f32; 3] = [0.2125, 0.7154, 0.0721];

#[derive(Clone, Debug, PartialEq)]
pub struct RgbImage {
    w: usize,
    h: usize,
    data: Vec<Rgb>,
    valid: Option<Vec<bool>>,
}

impl RgbImage {
    pub fn new(w: usize, h: usize, data: Vec<Rgb>) -> Result<Self> {
        if data.len() != w * h {
            return Err(InfestError::Shape {
                width: w,
                height: h,
                actual: data.len(),
            });
        }
        Ok(Self {
            w,
            h,
            data,
            valid: None,
        })
    }

    pub fn filled(w: usize, h: usize, px: Rgb) -> Self {
        Self {
            w,
            h,
            data: vec![px; w * h],
            valid: None,
        }
    }

    /// Build from interleaved 8-bit RGB bytes.
    pub fn from_u8(w: usize, h: usize, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != w * h * 3 {
            return Err(InfestError::Shape {
                width: w,
                height: h,
                actual: bytes.len() / 3,
            });
        }
        let data = bytes
            .chunks_exact(3)
            .map(|c| [c[0] as f32 / 255.0, c[1] as f32 / 255.0, c[2] as f32 / 255.0])
            .collect();
        Self::new(w, h, data)
    }

    /// Attach a validity plane; `false` marks missing pixels.
    pub fn with_validity(mut self, valid: &Mask) -> Result<Self> {
        if valid.width() != self.w || valid.height() != self.h {
            return Err(InfestError::Shape {
                width: self.w,
                height: self.h,
                actual: valid.width() * valid.height(),
            });
        }
        self.valid = (!valid.all()).then(|| valid.data().to_vec());
        Ok(self)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.w
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.h
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Rgb {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, px: Rgb) {
        self.data[y * self.w + x] = px;
    }

    #[inline]
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        self.valid.as_ref().map_or(true, |v| v[y * self.w + x])
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.data
    }

    pub fn has_invalid(&self) -> bool {
        self.valid.is_some()
    }

    /// Borrow the whole image as a view.
    pub fn as_view(&self) -> RgbView<'_> {
        RgbView {
            w: self.w,
            h: self.h,
            stride: self.w,
            data: &self.data,
            valid: self.valid.as_deref(),
        }
    }

    /// Borrow the region `rect` (clipped to the image) without copying.
    pub fn crop(&self, rect: &Rect) -> RgbView<'_> {
        let maxr = rect.maxr.min(self.h);
        let maxc = rect.maxc.min(self.w);
        let minr = rect.minr.min(maxr);
        let minc = rect.minc.min(maxc);
        let (w, h) = (maxc - minc, maxr - minr);
        // Both extents collapse so `row` never indexes into empty storage.
        if w == 0 || h == 0 {
            return RgbView {
                w: 0,
                h: 0,
                stride: self.w,
                data: &[],
                valid: None,
            };
        }
        let start = minr * self.w + minc;
        let end = start + (h - 1) * self.w + w;
        RgbView {
            w,
            h,
            stride: self.w,
            data: &self.data[start..end],
            valid: self.valid.as_deref().map(|v| &v[start..end]),
        }
    }

    /// Interleaved 8-bit RGB, rounding to the nearest level.
    pub fn to_u8(&self) -> Vec<u8> {
        self.as_view().to_u8()
    }
}

/// Borrowed, possibly strided window into an [`RgbImage`].
#[derive(Clone, Copy, Debug)]
pub struct RgbView<'a> {
    pub w: usize,
    pub h: usize,
    pub stride: usize,
    data: &'a [Rgb],
    valid: Option<&'a [bool]>,
}

impl<'a> RgbView<'a> {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Rgb {
        self.data[y * self.stride + x]
    }

    #[inline]
    pub fn is_valid(&self, x: usize, y: usize) -> bool {
        self.valid.map_or(true, |v| v[y * self.stride + x])
    }

    /// Validity plane of the view, `None` when every pixel is valid.
    pub fn validity(&self) -> Option<Mask> {
        self.valid?;
        Some(Mask::from_fn(self.w, self.h, |x, y| self.is_valid(x, y)))
    }

    /// Largest channel value over valid pixels (0 for an empty view).
    pub fn max_channel(&self) -> f32 {
        let mut m = 0.0f32;
        for y in 0..self.h {
            for (x, px) in self.row(y).iter().enumerate() {
                if self.is_valid(x, y) {
                    m = m.max(px[0]).max(px[1]).max(px[2]);
                }
            }
        }
        m
    }

    /// Luminance plane; invalid pixels are written as 0.
    pub fn to_gray(&self) -> ImageF32 {
        self.map_plane(|px| {
            GRAY_WEIGHTS[0] * px[0] + GRAY_WEIGHTS[1] * px[1] + GRAY_WEIGHTS[2] * px[2]
        })
    }

    /// HSV saturation plane, `(max - min) / max` and 0 for black pixels.
    pub fn to_saturation(&self) -> ImageF32 {
        self.map_plane(|px| {
            let max = px[0].max(px[1]).max(px[2]);
            let min = px[0].min(px[1]).min(px[2]);
            if max <= 0.0 {
                0.0
            } else {
                (max - min) / max
            }
        })
    }

    fn map_plane(&self, f: impl Fn(&Rgb) -> f32) -> ImageF32 {
        let mut out = ImageF32::new(self.w, self.h);
        for y in 0..self.h {
            for (x, px) in self.row(y).iter().enumerate() {
                if self.is_valid(x, y) {
                    out.set(x, y, f(px));
                }
            }
        }
        out
    }

    /// Copy into an owned image (validity preserved).
    pub fn to_owned_image(&self) -> RgbImage {
        let mut data = Vec::with_capacity(self.w * self.h);
        for y in 0..self.h {
            data.extend_from_slice(self.row(y));
        }
        RgbImage {
            w: self.w,
            h: self.h,
            data,
            valid: self.validity().map(|m| m.data().to_vec()),
        }
    }

    pub fn to_u8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.w * self.h * 3);
        for y in 0..self.h {
            for px in self.row(y) {
                for &c in px {
                    out.push(unit_to_u8(c));
                }
            }
        }
        out
    }
}

/// Round a `[0, 1]` value to the nearest 8-bit level.
#[inline]
pub fn unit_to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

impl<'a> ImageView for RgbView<'a> {
    type Pixel = Rgb;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn row(&self, y: usize) -> &[Rgb] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_shares_parent_stride() {
        let mut img = RgbImage::filled(6, 4, [0.0; 3]);
        img.set(3, 2, [1.0, 0.5, 0.25]);
        let view = img.crop(&Rect {
            minr: 1,
            minc: 2,
            maxr: 4,
            maxc: 5,
        });
        assert_eq!(view.shape(), (3, 3));
        assert_eq!(view.stride(), 6);
        assert_eq!(view.get(1, 1), [1.0, 0.5, 0.25]);
    }

    #[test]
    fn crop_outside_image_is_empty() {
        let img = RgbImage::filled(4, 4, [0.5; 3]);
        let view = img.crop(&Rect {
            minr: 6,
            minc: 1,
            maxr: 9,
            maxc: 3,
        });
        assert!(view.is_empty());
        assert_eq!(view.to_gray().data.len(), 0);
    }

    #[test]
    fn saturation_of_gray_is_zero() {
        let img = RgbImage::filled(2, 2, [0.4, 0.4, 0.4]);
        assert!(img.as_view().to_saturation().data.iter().all(|&s| s == 0.0));
    }
}

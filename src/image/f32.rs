//! Owned single-channel f32 raster, row-major with `stride == w`.
//!
//! Holds grayscale intensities, gradient elevation maps and the per-pixel
//! ichloro proxy.
use super::ImageView;

#[derive(Clone, Debug, PartialEq)]
pub struct ImageF32 {
    pub w: usize,
    pub h: usize,
    pub stride: usize,
    pub data: Vec<f32>,
}

impl ImageF32 {
    pub fn new(w: usize, h: usize) -> Self {
        Self::filled(w, h, 0.0)
    }

    pub fn filled(w: usize, h: usize, value: f32) -> Self {
        Self {
            w,
            h,
            stride: w,
            data: vec![value; w * h],
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.stride + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        self.data[y * self.stride + x] = v;
    }

    /// Sum of all pixel values, accumulated in f64.
    pub fn sum(&self) -> f64 {
        self.data.iter().map(|&v| v as f64).sum()
    }
}

impl ImageView for ImageF32 {
    type Pixel = f32;

    fn width(&self) -> usize {
        self.w
    }

    fn height(&self) -> usize {
        self.h
    }

    fn stride(&self) -> usize {
        self.stride
    }

    fn row(&self, y: usize) -> &[f32] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
}

//! Boolean raster used for foreground masks, lesion/healthy maps, layout
//! grids and validity planes.
use crate::error::{InfestError, Result};
use crate::types::Rect;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    w: usize,
    h: usize,
    data: Vec<bool>,
}

impl Mask {
    /// All-false mask of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self::full(w, h, false)
    }

    pub fn full(w: usize, h: usize, value: bool) -> Self {
        Self {
            w,
            h,
            data: vec![value; w * h],
        }
    }

    pub fn from_vec(w: usize, h: usize, data: Vec<bool>) -> Result<Self> {
        if data.len() != w * h {
            return Err(InfestError::Shape {
                width: w,
                height: h,
                actual: data.len(),
            });
        }
        Ok(Self { w, h, data })
    }

    /// Build a mask by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> bool) -> Self {
        let mut data = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                data.push(f(x, y));
            }
        }
        Self { w, h, data }
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
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.w + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: bool) {
        self.data[y * self.w + x] = v;
    }

    pub fn data(&self) -> &[bool] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [bool] {
        &mut self.data
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn all(&self) -> bool {
        self.data.iter().all(|&v| v)
    }

    pub fn any(&self) -> bool {
        self.data.iter().any(|&v| v)
    }

    pub fn invert(&mut self) {
        for v in &mut self.data {
            *v = !*v;
        }
    }

    /// Clear every pixel that is set in `other` (shapes must match).
    pub fn subtract(&mut self, other: &Mask) {
        debug_assert_eq!((self.w, self.h), (other.w, other.h));
        for (v, &o) in self.data.iter_mut().zip(other.data.iter()) {
            if o {
                *v = false;
            }
        }
    }

    /// Set (or clear) every pixel inside `rect`, clipped to the mask bounds.
    pub fn fill_rect(&mut self, rect: &Rect, value: bool) {
        let maxr = rect.maxr.min(self.h);
        let maxc = rect.maxc.min(self.w);
        for y in rect.minr.min(maxr)..maxr {
            let row = &mut self.data[y * self.w..(y + 1) * self.w];
            for v in &mut row[rect.minc.min(maxc)..maxc] {
                *v = value;
            }
        }
    }

    /// Copy the region `rect` into a new mask of the rect's size; an empty
    /// rect gives a 0×0 mask, matching [`RgbImage::crop`](super::RgbImage::crop).
    pub fn crop(&self, rect: &Rect) -> Mask {
        if rect.is_empty() {
            return Mask::new(0, 0);
        }
        let (w, h) = (rect.width(), rect.height());
        Mask::from_fn(w, h, |x, y| self.get(rect.minc + x, rect.minr + y))
    }
}

impl crate::image::traits::ImageView for Mask {
    type Pixel = bool;

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
        self.w
    }
    #[inline]
    fn row(&self, y: usize) -> &[bool] {
        let start = y * self.w;
        &self.data[start..start + self.w]
    }
}

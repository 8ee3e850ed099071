//! Sobel gradient magnitude.
//!
//! Both 3×3 kernels are normalised by 4 and borders are clamped, so a unit
//! step gives a magnitude close to 0.5 whatever its orientation.
use crate::image::{ImageF32, ImageView};

/// `sqrt((gx² + gy²) / 2)` per pixel; the elevation map for watershed flooding.
pub fn sobel_magnitude(l: &ImageF32) -> ImageF32 {
    let (w, h) = (l.w, l.h);
    let mut mag = ImageF32::new(w, h);
    for y in 0..h {
        let up = l.row(y.saturating_sub(1));
        let mid = l.row(y);
        let down = l.row((y + 1).min(h - 1));
        for x in 0..w {
            let (xl, xr) = (x.saturating_sub(1), (x + 1).min(w - 1));
            let gx = (up[xr] - up[xl]) + 2.0 * (mid[xr] - mid[xl]) + (down[xr] - down[xl]);
            let gy = (down[xl] - up[xl]) + 2.0 * (down[x] - up[x]) + (down[xr] - up[xr]);
            let (gx, gy) = (0.25 * gx, 0.25 * gy);
            mag.set(x, y, (0.5 * (gx * gx + gy * gy)).sqrt());
        }
    }
    mag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_image_has_zero_gradient() {
        let img = ImageF32::filled(5, 4, 0.7);
        let mag = sobel_magnitude(&img);
        assert!(mag.data.iter().all(|&m| m.abs() < 1e-6));
    }

    #[test]
    fn vertical_step_peaks_on_the_edge() {
        let mut img = ImageF32::new(6, 3);
        for y in 0..3 {
            for x in 3..6 {
                img.set(x, y, 1.0);
            }
        }
        let mag = sobel_magnitude(&img);
        assert!(mag.get(2, 1) > 0.3);
        assert!(mag.get(3, 1) > 0.3);
        assert_eq!(mag.get(0, 1), 0.0);
        assert_eq!(mag.get(5, 1), 0.0);
    }

    #[test]
    fn empty_input() {
        assert!(sobel_magnitude(&ImageF32::new(0, 0)).data.is_empty());
    }
}

//! Binary morphology on [`Mask`] rasters with a 3×3 square structuring
//! element, plus hole filling and connected-component filtering.
//!
//! Connectivity for hole filling and component labelling is 4 (edge
//! neighbours only).
use crate::image::Mask;
use std::collections::VecDeque;

/// How pixels outside the image behave during erosion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Border {
    /// Outside counts as set: objects touching the border are not eaten.
    Set,
    /// Outside counts as unset: every border-touching object shrinks.
    Unset,
}

/// Any-neighbour dilation; out-of-image pixels are ignored.
pub fn dilate3x3(src: &Mask) -> Mask {
    let (w, h) = (src.width(), src.height());
    let mut horiz = Mask::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let lo = x.saturating_sub(1);
            let hi = (x + 1).min(w.saturating_sub(1));
            horiz.set(x, y, (lo..=hi).any(|xx| src.get(xx, y)));
        }
    }
    let mut out = Mask::new(w, h);
    for y in 0..h {
        let lo = y.saturating_sub(1);
        let hi = (y + 1).min(h.saturating_sub(1));
        for x in 0..w {
            out.set(x, y, (lo..=hi).any(|yy| horiz.get(x, yy)));
        }
    }
    out
}

/// All-neighbour erosion with the given border policy.
pub fn erode3x3(src: &Mask, border: Border) -> Mask {
    let (w, h) = (src.width(), src.height());
    let edge_ok = border == Border::Set;
    let mut horiz = Mask::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let left = if x == 0 { edge_ok } else { src.get(x - 1, y) };
            let right = if x + 1 >= w { edge_ok } else { src.get(x + 1, y) };
            horiz.set(x, y, left && src.get(x, y) && right);
        }
    }
    let mut out = Mask::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let up = if y == 0 { edge_ok } else { horiz.get(x, y - 1) };
            let down = if y + 1 >= h { edge_ok } else { horiz.get(x, y + 1) };
            out.set(x, y, up && horiz.get(x, y) && down);
        }
    }
    out
}

/// Repeated erosion treating the outside as unset.
pub fn erode_iterations(src: &Mask, iterations: usize) -> Mask {
    let mut out = src.clone();
    for _ in 0..iterations {
        out = erode3x3(&out, Border::Unset);
    }
    out
}

/// Repeated dilation.
pub fn dilate_iterations(src: &Mask, iterations: usize) -> Mask {
    let mut out = src.clone();
    for _ in 0..iterations {
        out = dilate3x3(&out);
    }
    out
}

/// Closing (dilate, then erode) that does not erode at the image border.
pub fn close3x3(src: &Mask) -> Mask {
    erode3x3(&dilate3x3(src), Border::Set)
}

/// Set every unset region that is not connected to the image border.
pub fn fill_holes(src: &Mask) -> Mask {
    let (w, h) = (src.width(), src.height());
    let mut outside = Mask::new(w, h);
    let mut queue = VecDeque::new();
    let seed = |x: usize, y: usize, outside: &mut Mask, queue: &mut VecDeque<(usize, usize)>| {
        if !src.get(x, y) && !outside.get(x, y) {
            outside.set(x, y, true);
            queue.push_back((x, y));
        }
    };
    for x in 0..w {
        seed(x, 0, &mut outside, &mut queue);
        if h > 1 {
            seed(x, h - 1, &mut outside, &mut queue);
        }
    }
    for y in 0..h {
        seed(0, y, &mut outside, &mut queue);
        if w > 1 {
            seed(w - 1, y, &mut outside, &mut queue);
        }
    }
    while let Some((x, y)) = queue.pop_front() {
        for (nx, ny) in neighbours4(x, y, w, h) {
            seed(nx, ny, &mut outside, &mut queue);
        }
    }
    Mask::from_fn(w, h, |x, y| src.get(x, y) || !outside.get(x, y))
}

/// Component labels (0 = unset) and the pixel count of each label.
///
/// `sizes[0]` is unused so that `sizes[label]` indexes directly.
pub fn label_components(src: &Mask) -> (Vec<u32>, Vec<usize>) {
    let (w, h) = (src.width(), src.height());
    let mut labels = vec![0u32; w * h];
    let mut sizes = vec![0usize];
    let mut queue = VecDeque::new();
    for y in 0..h {
        for x in 0..w {
            if !src.get(x, y) || labels[y * w + x] != 0 {
                continue;
            }
            let label = sizes.len() as u32;
            let mut size = 0usize;
            labels[y * w + x] = label;
            queue.push_back((x, y));
            while let Some((cx, cy)) = queue.pop_front() {
                size += 1;
                for (nx, ny) in neighbours4(cx, cy, w, h) {
                    let i = ny * w + nx;
                    if src.get(nx, ny) && labels[i] == 0 {
                        labels[i] = label;
                        queue.push_back((nx, ny));
                    }
                }
            }
            sizes.push(size);
        }
    }
    (labels, sizes)
}

/// Drop connected components smaller than `min_size` pixels.
pub fn remove_small_objects(src: &Mask, min_size: usize) -> Mask {
    if min_size <= 1 {
        return src.clone();
    }
    let (labels, sizes) = label_components(src);
    let w = src.width();
    Mask::from_fn(w, src.height(), |x, y| {
        let label = labels[y * w + x] as usize;
        label != 0 && sizes[label] >= min_size
    })
}

pub(crate) fn neighbours4(
    x: usize,
    y: usize,
    w: usize,
    h: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let cands = [
        (x.wrapping_sub(1), y),
        (x + 1, y),
        (x, y.wrapping_sub(1)),
        (x, y + 1),
    ];
    cands.into_iter().filter(move |&(nx, ny)| nx < w && ny < h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> Mask {
        Mask::from_fn(w, h, |x, y| x >= x0 && x < x1 && y >= y0 && y < y1)
    }

    #[test]
    fn close_fills_single_pixel_hole() {
        let mut m = Mask::full(5, 5, true);
        m.set(2, 2, false);
        assert!(close3x3(&m).all());
    }

    #[test]
    fn close_keeps_border_objects_intact() {
        let m = square(6, 6, 0, 0, 3, 3);
        assert_eq!(close3x3(&m), m);
    }

    #[test]
    fn erosion_with_unset_border_trims_frame() {
        let m = Mask::full(6, 5, true);
        let e = erode_iterations(&m, 2);
        assert_eq!(e.count(), (6 - 4) * (5 - 4));
        assert!(!e.get(1, 1));
        assert!(e.get(2, 2));
    }

    #[test]
    fn fill_holes_ignores_regions_open_to_border() {
        let mut ring = square(7, 7, 1, 1, 6, 6);
        ring.set(3, 3, false);
        ring.set(3, 2, false);
        let filled = fill_holes(&ring);
        assert!(filled.get(3, 3) && filled.get(3, 2));
        assert!(!filled.get(0, 0));

        let mut open = square(7, 7, 1, 1, 6, 6);
        for y in 1..6 {
            open.set(3, y, false);
        }
        open.set(3, 0, false);
        assert_eq!(fill_holes(&open), open);
    }

    #[test]
    fn small_objects_are_removed() {
        let mut m = square(10, 10, 0, 0, 4, 4);
        m.set(8, 8, true);
        let out = remove_small_objects(&m, 5);
        assert_eq!(out.count(), 16);
        assert!(!out.get(8, 8));
    }

    #[test]
    fn diagonal_pixels_are_separate_components() {
        let mut m = Mask::new(3, 3);
        m.set(0, 0, true);
        m.set(1, 1, true);
        let (_, sizes) = label_components(&m);
        assert_eq!(sizes.len() - 1, 2);
    }
}

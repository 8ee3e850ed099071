//! Marker-based watershed flooding on an elevation map.
//!
//! Pixels are processed in order of increasing elevation, ties broken by
//! insertion order, so the result is deterministic. Every pixel reachable
//! from a marker through 4-neighbours receives that marker's label.
use super::morph::neighbours4;
use crate::image::ImageF32;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Clone, Copy, Debug)]
struct Entry {
    level: f32,
    age: u64,
    index: usize,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed so that `BinaryHeap` pops the lowest, oldest entry first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .level
            .total_cmp(&self.level)
            .then_with(|| other.age.cmp(&self.age))
    }
}

/// Flood `elevation` from `markers` (0 = unlabelled) and return the labels.
pub fn watershed(elevation: &ImageF32, markers: &[u8]) -> Vec<u8> {
    let (w, h) = (elevation.w, elevation.h);
    debug_assert_eq!(markers.len(), w * h);
    let mut labels = markers.to_vec();
    let mut heap = BinaryHeap::new();
    let mut age = 0u64;
    for (index, &label) in markers.iter().enumerate() {
        if label != 0 {
            heap.push(Entry {
                level: elevation.data[index],
                age,
                index,
            });
            age += 1;
        }
    }
    while let Some(Entry { index, .. }) = heap.pop() {
        let label = labels[index];
        let (x, y) = (index % w, index / w);
        for (nx, ny) in neighbours4(x, y, w, h) {
            let ni = ny * w + nx;
            if labels[ni] == 0 {
                labels[ni] = label;
                heap.push(Entry {
                    level: elevation.data[ni],
                    age,
                    index: ni,
                });
                age += 1;
            }
        }
    }
    labels
}

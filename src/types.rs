use serde::{Deserialize, Serialize};

/// Pixel rectangle with exclusive upper bounds, already clamped to an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub minr: usize,
    pub minc: usize,
    pub maxr: usize,
    pub maxc: usize,
}

impl Rect {
    #[inline]
    pub fn width(&self) -> usize {
        self.maxc.saturating_sub(self.minc)
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.maxr.saturating_sub(self.minr)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Overlap of two rectangles, `None` when they do not intersect.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let r = Rect {
            minr: self.minr.max(other.minr),
            minc: self.minc.max(other.minc),
            maxr: self.maxr.min(other.maxr),
            maxc: self.maxc.min(other.maxc),
        };
        (r.minr < r.maxr && r.minc < r.maxc).then_some(r)
    }

    /// Express `self` in the coordinate frame whose origin is `origin`'s corner.
    pub fn relative_to(&self, origin: &Rect) -> Rect {
        Rect {
            minr: self.minr.saturating_sub(origin.minr),
            minc: self.minc.saturating_sub(origin.minc),
            maxr: self.maxr.saturating_sub(origin.minr),
            maxc: self.maxc.saturating_sub(origin.minc),
        }
    }

    /// Centre as `(row, column)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.minr + self.maxr) as f64 / 2.0,
            (self.minc + self.maxc) as f64 / 2.0,
        )
    }
}

/// Per-leaf measurement for one frame; one row of the quantification table.
///
/// `leaf_area` counts healthy *and* lesion pixels, so lesion pixels appear in
/// both `lesion_area` and `leaf_area`. Downstream analyses rely on this; it is
/// not a disjoint partition of the mask.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeafStats {
    pub id: String,
    pub lesion_area: u64,
    pub leaf_area: u64,
    pub ichloro_sum: f64,
    pub mask_area: u64,
    pub time: Option<i64>,
    /// `(row, column)` centre of the sampled box.
    pub position: Option<(f64, f64)>,
}

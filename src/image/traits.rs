/// Read-only access to a row-major raster whose rows may be padded
/// (`stride >= width`). Crops borrowed from a larger image use the parent's
/// stride.
pub trait ImageView {
    type Pixel: Copy;

    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn stride(&self) -> usize;

    fn row(&self, y: usize) -> &[Self::Pixel];

    /// `(height, width)`, the spatial extent in row/column order.
    fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

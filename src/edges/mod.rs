//! Gradient utilities used to build elevation maps for watershed flooding.
pub mod grad;

pub use grad::sobel_magnitude;

//! Run diagnostics returned next to the quantification and fitting results.

pub mod timing;

pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};

//! Quantify a time series of panel photographs.
//!
//! Frames are independent: each worker loads one image, builds a [`Panel`],
//! optionally corrects its colours and quantifies every leaf. Results are
//! merged only after every frame finished and are then sorted by
//! `(time, id)`, so the table does not depend on the pool size.
pub mod artifacts;
pub mod frames;
pub mod source;
pub mod table;

pub use artifacts::LeafArtifacts;
pub use frames::{discover_frames, find_layout, frame_index, plan_frames, Frame};
pub use source::{FileImageSource, ImageSource};

use crate::diagnostics::{StageTiming, TimingBreakdown};
use crate::error::{InfestError, Result};
use crate::image::ImageView;
use crate::normalize::{ContrastPolicy, NormalizeParams, Normalization};
use crate::panel::{Layout, Panel, PanelParams};
use crate::types::LeafStats;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchParams {
    /// Frames processed concurrently; 1 runs sequentially.
    pub workers: usize,
    pub panel: PanelParams,
    pub normalize: NormalizeParams,
    /// When set, review images are written here for every leaf.
    pub artifacts_dir: Option<PathBuf>,
}

impl Default for BatchParams {
    fn default() -> Self {
        Self {
            workers: 1,
            panel: PanelParams::default(),
            normalize: NormalizeParams::default(),
            artifacts_dir: None,
        }
    }
}

/// Merged result of a batch.
#[derive(Clone, Debug, Default)]
pub struct BatchOutput {
    /// Sorted by `(time, id)`.
    pub rows: Vec<LeafStats>,
    /// Sorted like `rows`; empty unless artifacts were requested.
    pub artifacts: Vec<LeafArtifacts>,
    pub timing: TimingBreakdown,
}

struct FrameResult {
    frame: Frame,
    rows: Vec<LeafStats>,
    artifacts: Vec<LeafArtifacts>,
    timing: StageTiming,
}

/// Run the whole batch. The first frame error aborts it.
pub fn run_batch(
    frames: &[Frame],
    layout: Arc<Layout>,
    source: &dyn ImageSource,
    params: &BatchParams,
) -> Result<BatchOutput> {
    let start = Instant::now();
    info!(
        "quantifying {} frames with {} worker(s), {} samples per panel",
        frames.len(),
        params.workers.max(1),
        layout.len()
    );
    let process = |frame: &Frame| {
        process_frame(frame, &layout, source, params)
            .map_err(|e| e.in_frame(frame.path.clone()))
    };
    let mut results = run_frames(frames, params.workers, process)?;

    results.sort_by(|a, b| a.frame.cmp(&b.frame));
    let mut out = BatchOutput::default();
    for result in results {
        out.rows.extend(result.rows);
        out.artifacts.extend(result.artifacts);
        out.timing.stages.push(result.timing);
    }
    // Stable: equal (time, id) keys keep the frame path order from above.
    out.rows.sort_by(|a, b| (a.time, &a.id).cmp(&(b.time, &b.id)));
    out.artifacts
        .sort_by(|a, b| (a.time, &a.id).cmp(&(b.time, &b.id)));
    out.timing.total_ms = crate::diagnostics::elapsed_ms(start);
    info!(
        "batch finished: {} rows in {:.1} ms",
        out.rows.len(),
        out.timing.total_ms
    );
    Ok(out)
}

#[cfg(feature = "parallel")]
fn run_frames<F>(frames: &[Frame], workers: usize, process: F) -> Result<Vec<FrameResult>>
where
    F: Fn(&Frame) -> Result<FrameResult> + Sync + Send,
{
    if workers <= 1 || frames.len() <= 1 {
        return frames.iter().map(process).collect();
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| InfestError::Pool(format!("failed to build thread pool: {e}")))?;
    pool.install(|| frames.par_iter().map(process).collect())
}

#[cfg(not(feature = "parallel"))]
fn run_frames<F>(frames: &[Frame], workers: usize, process: F) -> Result<Vec<FrameResult>>
where
    F: Fn(&Frame) -> Result<FrameResult> + Sync + Send,
{
    if workers > 1 {
        debug!("built without the `parallel` feature; running {workers} workers sequentially");
    }
    frames.iter().map(process).collect()
}

fn process_frame(
    frame: &Frame,
    layout: &Arc<Layout>,
    source: &dyn ImageSource,
    params: &BatchParams,
) -> Result<FrameResult> {
    let start = Instant::now();
    debug!("processing frame {} ({})", frame.time, frame.path.display());
    let image = source.load(&frame.path)?;
    let panel = Panel::new(image, Arc::clone(layout), params.panel.clone()).with_time(Some(frame.time));
    let panel = normalize_panel(panel, &params.normalize)?;

    let mut rows = Vec::with_capacity(layout.len());
    let mut artifacts = Vec::new();
    for leaf in panel.leaves() {
        let analysis = leaf.analyze();
        if let Some(dir) = &params.artifacts_dir {
            if !leaf.view().is_empty() {
                artifacts.push(artifacts::write_leaf_artifacts(dir, &leaf, &analysis)?);
            }
        }
        rows.push(leaf.stats_from(&analysis));
    }
    Ok(FrameResult {
        frame: frame.clone(),
        rows,
        artifacts,
        timing: StageTiming::since(format!("frame {}", frame.time), start),
    })
}

fn normalize_panel(panel: Panel, params: &NormalizeParams) -> Result<Panel> {
    let corrected = match params.mode {
        Normalization::None => return Ok(panel),
        Normalization::Uniform => panel.correct_uniform(),
        Normalization::Nonuniform => panel.correct_nonuniform(params),
    };
    match (corrected, params.on_low_contrast) {
        (Ok(corrected), _) => Ok(corrected),
        (Err(err), ContrastPolicy::Abort) => Err(err.into()),
        (Err(err), ContrastPolicy::Uncorrected) => {
            warn!(
                "colour correction skipped for frame {:?}: {err}",
                panel.time()
            );
            Ok(panel)
        }
    }
}

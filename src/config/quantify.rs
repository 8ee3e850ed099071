use super::load_json;
use crate::batch::{discover_frames, find_layout, plan_frames, BatchParams, Frame};
use crate::error::{ConfigError, Result};
use crate::fit::FitParams;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuantifyOutput {
    /// Quantification table; defaults to `analysis.txt` next to the first frame.
    pub table: Option<PathBuf>,
    /// Per-frame timing report.
    pub timing_json: Option<PathBuf>,
}

/// Optional growth-curve fitting run on the fresh table.
#[derive(Clone, Debug, Deserialize)]
pub struct FitSection {
    /// Output prefix: `{prefix}-coef.tsv`, `{prefix}-preds.tsv`, `{prefix}-latency.tsv`.
    pub prefix: PathBuf,
    #[serde(default)]
    pub params: FitParams,
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuantifyConfig {
    /// Image files and/or directories of images named `<time>.<ext>`.
    pub images: Vec<PathBuf>,
    /// Layout file; looked up under `grid_layout/` next to the images if absent.
    #[serde(default)]
    pub layout: Option<PathBuf>,
    #[serde(default)]
    pub output: QuantifyOutput,
    #[serde(default)]
    pub batch: BatchParams,
    #[serde(default)]
    pub fit: Option<FitSection>,
}

pub fn load_config(path: &Path) -> std::result::Result<QuantifyConfig, ConfigError> {
    load_json(path)
}

impl QuantifyConfig {
    /// Expand directories and validate every frame name.
    pub fn frames(&self) -> Result<Vec<Frame>> {
        let mut files = Vec::new();
        let mut frames = Vec::new();
        for entry in &self.images {
            if entry.is_dir() {
                frames.extend(discover_frames(entry)?);
            } else {
                files.push(entry.clone());
            }
        }
        frames.extend(plan_frames(files)?);
        frames.sort();
        frames.dedup();
        Ok(frames)
    }

    pub fn layout_path(&self, frames: &[Frame]) -> Option<PathBuf> {
        self.layout.clone().or_else(|| find_layout(frames))
    }

    pub fn table_path(&self, frames: &[Frame]) -> PathBuf {
        self.output.table.clone().unwrap_or_else(|| {
            frames
                .first()
                .and_then(|f| f.path.parent())
                .map(|dir| dir.join("analysis.txt"))
                .unwrap_or_else(|| PathBuf::from("analysis.txt"))
        })
    }
}

//! Per-leaf review images written next to the quantification table.
//!
//! Files are named `{id}_time{t:05}_{orig|lesion|leaf|ichloro}.png`.
use crate::error::Result;
use crate::image::io::{save_grayscale_f32, save_mask_u8, save_rgb_u8};
use crate::leaf::{Leaf, LeafAnalysis};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths of the images written for one `(frame, leaf)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafArtifacts {
    pub id: String,
    pub time: Option<i64>,
    pub orig: PathBuf,
    pub lesion: PathBuf,
    pub leaf: PathBuf,
    pub ichloro: PathBuf,
}

fn artifact_path(dir: &Path, id: &str, time: Option<i64>, kind: &str) -> PathBuf {
    dir.join(format!("{id}_time{:05}_{kind}.png", time.unwrap_or(0)))
}

pub fn write_leaf_artifacts(dir: &Path, leaf: &Leaf<'_>, analysis: &LeafAnalysis) -> Result<LeafArtifacts> {
    let (id, time) = (leaf.id(), leaf.time());
    let out = LeafArtifacts {
        id: id.to_string(),
        time,
        orig: artifact_path(dir, id, time, "orig"),
        lesion: artifact_path(dir, id, time, "lesion"),
        leaf: artifact_path(dir, id, time, "leaf"),
        ichloro: artifact_path(dir, id, time, "ichloro"),
    };
    save_rgb_u8(leaf.view(), &out.orig)?;
    save_mask_u8(&analysis.lesion, &out.lesion)?;
    save_mask_u8(&analysis.healthy, &out.leaf)?;
    save_grayscale_f32(&analysis.ichloro, &out.ichloro)?;
    Ok(out)
}

//! Frame planning: every photograph is named after its integer time index.
use crate::error::{ConfigError, InfestError, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Extensions picked up by [`discover_frames`].
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tif", "tiff"];

/// One input photograph and its time index.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Frame {
    pub time: i64,
    pub path: PathBuf,
}

/// Time index encoded in a file stem, e.g. `dir/0042.jpg` → 42.
pub fn frame_index(path: &Path) -> std::result::Result<i64, ConfigError> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.trim().parse::<i64>().ok())
        .ok_or_else(|| ConfigError::FrameName {
            path: path.to_path_buf(),
        })
}

/// Validate every name up front and order the frames by time.
///
/// Fails on the first name that is not an integer, before any image is read.
pub fn plan_frames<I, P>(paths: I) -> std::result::Result<Vec<Frame>, ConfigError>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
{
    let mut frames = paths
        .into_iter()
        .map(|p| {
            let path = p.into();
            frame_index(&path).map(|time| Frame { time, path })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    frames.sort();
    debug!("planned {} frames", frames.len());
    Ok(frames)
}

/// Image files directly inside `dir`, planned as frames.
pub fn discover_frames(dir: &Path) -> Result<Vec<Frame>> {
    let entries = fs::read_dir(dir).map_err(|e| InfestError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| InfestError::io(dir, e))?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_image {
            paths.push(path);
        }
    }
    Ok(plan_frames(paths)?)
}

/// Conventional layout location next to the photographs:
/// `grid_layout/grid_layout.layout`, then `grid_layout/grid.layout`.
pub fn find_layout(frames: &[Frame]) -> Option<PathBuf> {
    let mut dirs: Vec<&Path> = frames.iter().filter_map(|f| f.path.parent()).collect();
    dirs.sort();
    dirs.dedup();
    dirs.into_iter().find_map(|dir| {
        ["grid_layout.layout", "grid.layout"]
            .iter()
            .map(|name| dir.join("grid_layout").join(name))
            .find(|p| p.is_file())
    })
}

//! Error types shared by the quantification and fitting pipelines.
//!
//! Three families are distinguished:
//! - [`ConfigError`]: pre-flight problems (layout, mask kind, frame names,
//!   config files). Always fatal.
//! - [`LowContrast`]: a crop whose histogram collapsed; recoverable by the
//!   caller of the mask engine.
//! - [`InfestError::FrameProcessing`]: anything else going wrong while a frame
//!   is processed. Aborts the batch.
use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = InfestError> = std::result::Result<T, E>;

/// Fatal configuration problems detected before any frame is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{path}:{line}: could not convert {column} value '{value}' into an integer")]
    LayoutValue {
        path: PathBuf,
        line: usize,
        column: &'static str,
        value: String,
    },
    #[error("{path}:{line}: expected 5 tab-separated fields (id, minr, minc, maxr, maxc), found {found}")]
    LayoutFields {
        path: PathBuf,
        line: usize,
        found: usize,
    },
    #[error("{path}:{line}: empty box for '{id}' (requires minr < maxr and minc < maxc)")]
    LayoutBox {
        path: PathBuf,
        line: usize,
        id: String,
    },
    #[error("unknown mask type '{0}' (expected threshold, otsu, watershed, original or none)")]
    UnknownMaskKind(String),
    #[error("no layout file given and none found under grid_layout/ next to the images")]
    MissingLayout,
    #[error("could not find an integer frame index in image name '{}'", path.display())]
    FrameName { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The crop's histogram has too few occupied bins to be thresholded.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("low contrast: only {occupied_bins} occupied histogram bin(s), {classes} classes required")]
pub struct LowContrast {
    pub occupied_bins: usize,
    pub classes: usize,
}

#[derive(Debug, Error)]
pub enum InfestError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    LowContrast(#[from] LowContrast),
    #[error("failed to process frame {}: {source}", path.display())]
    FrameProcessing {
        path: PathBuf,
        #[source]
        source: Box<InfestError>,
    },
    #[error("image error for {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("I/O error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: {message}", path.display())]
    Table {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("image buffer of {actual} pixels does not match {width}x{height}")]
    Shape {
        width: usize,
        height: usize,
        actual: usize,
    },
    #[error("worker pool: {0}")]
    Pool(String),
}

impl InfestError {
    /// Wrap an error raised while processing the frame at `path`.
    pub fn in_frame(self, path: impl Into<PathBuf>) -> Self {
        match self {
            e @ InfestError::FrameProcessing { .. } => e,
            other => InfestError::FrameProcessing {
                path: path.into(),
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        InfestError::Io {
            path: path.into(),
            source,
        }
    }
}

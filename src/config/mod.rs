//! JSON run configurations for the binaries.
//!
//! Every section deserialises with defaults, so a config only has to name
//! its inputs and outputs.
pub mod fit;
pub mod quantify;

use crate::error::ConfigError;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Read and parse a JSON config file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

use super::load_json;
use crate::error::ConfigError;
use crate::fit::FitParams;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Fit an existing quantification table.
#[derive(Clone, Debug, Deserialize)]
pub struct FitConfig {
    pub table: PathBuf,
    /// Output prefix: `{prefix}-coef.tsv`, `{prefix}-preds.tsv`, `{prefix}-latency.tsv`.
    #[serde(default = "default_prefix")]
    pub prefix: PathBuf,
    #[serde(default)]
    pub params: FitParams,
}

fn default_prefix() -> PathBuf {
    PathBuf::from("infest_results")
}

pub fn load_config(path: &Path) -> Result<FitConfig, ConfigError> {
    load_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_and_params_default() {
        let config: FitConfig = serde_json::from_str(r#"{ "table": "analysis.txt" }"#).unwrap();
        assert_eq!(config.prefix, Path::new("infest_results"));
        assert_eq!(config.params.threshold, 300.0);
        assert!(config.params.gate_gompertz);
    }
}

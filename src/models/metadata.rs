//! Feature metadata shipped next to the model artifact

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Sidecar file name looked up next to the model when no path is configured
pub const METADATA_FILE: &str = "feature_info.json";

/// Number of anonymized PCA features in the credit-card dataset
pub const DEFAULT_FEATURE_COUNT: usize = 28;

/// Training-time metadata describing the model's input contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name reported in logs and reports
    #[serde(default)]
    pub model_name: Option<String>,
    /// Feature columns in the order the model expects them
    pub feature_names: Vec<String>,
    /// Decision threshold chosen at training time
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl ModelMetadata {
    /// Load metadata from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model metadata from {:?}", path))?;
        let metadata: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse model metadata {:?}", path))?;
        validate_feature_names(&metadata.feature_names)?;
        Ok(metadata)
    }

    /// Default sidecar location for a model file
    pub fn sidecar_path<P: AsRef<Path>>(model_path: P) -> PathBuf {
        model_path
            .as_ref()
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(METADATA_FILE)
    }
}

/// `V1` .. `V28`
pub fn default_feature_names() -> Vec<String> {
    (1..=DEFAULT_FEATURE_COUNT).map(|i| format!("V{}", i)).collect()
}

/// A usable feature list is non-empty and free of duplicates
pub fn validate_feature_names(names: &[String]) -> Result<()> {
    if names.is_empty() {
        anyhow::bail!("Feature list is empty");
    }
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            anyhow::bail!("Feature '{}' listed more than once", name);
        }
    }
    Ok(())
}

//! Configuration management for the batch scorer

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default config file, loaded when present
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment overrides, e.g. `FRAUD_SCORER__MODEL__PATH`
pub const ENV_PREFIX: &str = "FRAUD_SCORER";

/// How the predicted label column is rendered in the output table
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LabelFormat {
    /// 0 / 1
    #[default]
    Numeric,
    /// Legit / Fraud
    Text,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub schema: SchemaConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX model file
    pub path: String,
    /// Path to the feature metadata sidecar; defaults to `feature_info.json`
    /// next to the model
    pub metadata_path: Option<String>,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
    /// Probability cut-off used when the model has no label output
    pub threshold: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/credit_card_model.onnx".to_string(),
            metadata_path: None,
            onnx_threads: 1,
            threshold: 0.5,
        }
    }
}

/// Upload schema configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Ground-truth column dropped before scoring
    pub label_column: String,
    /// Feature order, used when the model ships no metadata
    pub feature_names: Option<Vec<String>>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            label_column: "Class".to_string(),
            feature_names: None,
        }
    }
}

/// Output table configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub label_format: LabelFormat,
    /// Name of the appended predicted-label column
    pub prediction_column: String,
    /// Name of the appended fraud-probability column
    pub probability_column: String,
    /// Directory for scored tables and reports
    pub output_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            label_format: LabelFormat::Numeric,
            prediction_column: "Prediction".to_string(),
            probability_column: "Fraud_Probability".to_string(),
            output_dir: "scored".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file (if present) and environment
    pub fn load() -> Result<Self> {
        Self::build(File::with_name(DEFAULT_CONFIG_PATH).required(false))
    }

    /// Load configuration from a specific path, which must exist
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        Self::build(File::from(path))
    }

    fn build(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self> {
        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("schema.feature_names"),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

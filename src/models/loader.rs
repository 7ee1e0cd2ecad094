//! ONNX model loader

use crate::config::AppConfig;
use crate::models::inference::OnnxModel;
use crate::models::metadata::{default_feature_names, validate_feature_names, ModelMetadata};
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use tracing::{info, warn};

/// ONNX Runtime environment, committed once per process
static ORT_ENV: OnceCell<()> = OnceCell::new();

/// Initialize the ONNX Runtime environment on first call
fn init_runtime() -> Result<()> {
    ORT_ENV
        .get_or_try_init(|| {
            ort::init()
                .commit()
                .context("Failed to initialize ONNX Runtime")?;
            info!("ONNX Runtime initialized");
            Ok(())
        })
        .map(|_| ())
}

/// Pick the probability and label outputs from the graph's output names.
///
/// The label output is the first name containing `label`. The probability
/// output never reuses it: a non-label name containing `prob` wins over one
/// containing `output`, then the last non-label output.
pub(crate) fn resolve_outputs(names: &[&str]) -> (String, Option<String>) {
    let label = names.iter().find(|n| n.contains("label")).map(|n| n.to_string());
    let candidates: Vec<&str> = names
        .iter()
        .copied()
        .filter(|n| !n.contains("label"))
        .collect();

    let probability = candidates
        .iter()
        .find(|n| n.contains("prob"))
        .or_else(|| candidates.iter().find(|n| n.contains("output")))
        .or_else(|| candidates.last())
        .map(|n| n.to_string())
        .unwrap_or_else(|| "probabilities".to_string());

    (probability, label)
}

/// Resolve the feature order and decision threshold.
///
/// Features come from the metadata sidecar, then `schema.feature_names`, then
/// `V1..V28`. The threshold comes from metadata, then `model.threshold`.
pub(crate) fn resolve_contract(
    metadata: Option<&ModelMetadata>,
    config: &AppConfig,
) -> Result<(Vec<String>, f64)> {
    let feature_names = match (metadata, &config.schema.feature_names) {
        (Some(meta), _) => meta.feature_names.clone(),
        (None, Some(names)) => {
            validate_feature_names(names).context("Invalid schema.feature_names")?;
            names.clone()
        }
        (None, None) => {
            warn!("No feature metadata found, assuming V1..V28 feature order");
            default_feature_names()
        }
    };

    let threshold = metadata
        .and_then(|m| m.threshold)
        .unwrap_or(config.model.threshold);
    if !(0.0..=1.0).contains(&threshold) {
        anyhow::bail!("Decision threshold {} is outside [0, 1]", threshold);
    }

    Ok((feature_names, threshold))
}

/// Loaded ONNX session with its resolved input/output names
pub struct LoadedModel {
    /// Model name
    pub name: String,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the feature matrix
    pub input_name: String,
    /// Output name for class probabilities
    pub probability_output: String,
    /// Output name for predicted labels, if the graph exports one
    pub label_output: Option<String>,
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load the configured model together with its feature contract
    pub fn load(&self, config: &AppConfig) -> Result<OnnxModel> {
        let model_path = Path::new(&config.model.path);
        let metadata = self.load_metadata(config, model_path)?;

        let (feature_names, threshold) = resolve_contract(metadata.as_ref(), config)?;

        let name = metadata
            .as_ref()
            .and_then(|m| m.model_name.clone())
            .or_else(|| {
                model_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "model".to_string());

        let loaded = self.load_model(model_path, &name)?;

        info!(
            model = %name,
            features = feature_names.len(),
            threshold = threshold,
            "Model ready"
        );

        Ok(OnnxModel::new(loaded, feature_names, threshold))
    }

    /// Read the metadata sidecar. An explicitly configured path must exist;
    /// the default sidecar location is optional.
    fn load_metadata(&self, config: &AppConfig, model_path: &Path) -> Result<Option<ModelMetadata>> {
        match &config.model.metadata_path {
            Some(path) => ModelMetadata::load(path).map(Some),
            None => {
                let sidecar = ModelMetadata::sidecar_path(model_path);
                if sidecar.exists() {
                    ModelMetadata::load(&sidecar).map(Some)
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Load a single ONNX model from file
    pub fn load_model<P: AsRef<Path>>(&self, path: P, name: &str) -> Result<LoadedModel> {
        let path = path.as_ref();

        init_runtime()?;

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_names: Vec<&str> = session.outputs.iter().map(|o| o.name.as_str()).collect();
        let (probability_output, label_output) = resolve_outputs(&output_names);

        info!(
            model = %name,
            input = %input_name,
            probabilities = %probability_output,
            label = ?label_output,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name: name.to_string(),
            session,
            input_name,
            probability_output,
            label_output,
        })
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

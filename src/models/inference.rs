//! ONNX Runtime implementation of the fraud model capability

use crate::models::loader::LoadedModel;
use crate::models::FraudModel;
use anyhow::{Context, Result};
use ndarray::Array2;
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use std::sync::Mutex;
use tracing::debug;

/// Raw outputs of one session run
struct BatchOutputs {
    probabilities: Vec<f64>,
    labels: Option<Vec<u8>>,
}

/// Binary classifier exported to ONNX (sklearn-onnx, xgboost, lightgbm, ...)
pub struct OnnxModel {
    name: String,
    /// Running a session needs `&mut`, so calls are serialized
    model: Mutex<LoadedModel>,
    feature_names: Vec<String>,
    /// Cut-off applied when the graph has no label output
    threshold: f64,
}

impl OnnxModel {
    pub fn new(model: LoadedModel, feature_names: Vec<String>, threshold: f64) -> Self {
        Self {
            name: model.name.clone(),
            model: Mutex::new(model),
            feature_names,
            threshold,
        }
    }

    /// Run the whole matrix through the session once
    fn run_batch(&self, features: &Array2<f32>) -> Result<BatchOutputs> {
        let (rows, cols) = features.dim();
        if cols != self.feature_names.len() {
            anyhow::bail!(
                "model expects {} features, batch has {}",
                self.feature_names.len(),
                cols
            );
        }

        let shape = vec![rows as i64, cols as i64];
        let data: Vec<f32> = features.iter().copied().collect();
        let input_tensor =
            Tensor::from_array((shape, data)).context("Failed to create input tensor")?;

        let mut model = self
            .model
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        let LoadedModel {
            session,
            input_name,
            probability_output,
            label_output,
            ..
        } = &mut *model;

        let outputs = session.run(ort::inputs![input_name.as_str() => input_tensor])?;

        let output = outputs
            .get(probability_output.as_str())
            .ok_or_else(|| anyhow::anyhow!("Output '{}' missing", probability_output))?;
        let probabilities = extract_probabilities(output, rows)?;

        let labels = match label_output {
            Some(name) => match outputs.get(name.as_str()) {
                Some(output) => Some(extract_labels(output, rows)?),
                None => None,
            },
            None => None,
        };

        debug!(
            model = %self.name,
            rows = rows,
            has_labels = labels.is_some(),
            "Batch inference complete"
        );

        Ok(BatchOutputs {
            probabilities,
            labels,
        })
    }
}

impl FraudModel for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &Array2<f32>) -> Result<Vec<u8>> {
        let outputs = self.run_batch(features)?;
        Ok(match outputs.labels {
            Some(labels) => labels,
            None => outputs
                .probabilities
                .iter()
                .map(|&p| u8::from(p >= self.threshold))
                .collect(),
        })
    }

    fn predict_proba(&self, features: &Array2<f32>) -> Result<Vec<f64>> {
        Ok(self.run_batch(features)?.probabilities)
    }
}

/// Extract per-row fraud probabilities.
/// Handles tensor outputs (XGBoost, RandomForest) and seq(map) outputs (CatBoost, LightGBM).
fn extract_probabilities(output: &ort::value::DynValue, rows: usize) -> Result<Vec<f64>> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        return fraud_column(&dims, data, rows);
    }

    let dtype = output.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        return extract_from_sequence_map(output, rows);
    }

    anyhow::bail!("Unsupported probability output type: {:?}", dtype)
}

/// Pick the positive-class probability per row from a flat tensor
fn fraud_column(dims: &[i64], data: &[f32], rows: usize) -> Result<Vec<f64>> {
    let classes = match dims {
        [n, c] if *n as usize == rows => *c as usize,
        [n] if *n as usize == rows => 1,
        _ => anyhow::bail!("Unexpected probability shape {:?} for {} rows", dims, rows),
    };

    if classes == 0 || data.len() < rows * classes {
        anyhow::bail!("Probability tensor too small: {} values", data.len());
    }

    // [rows, 1] and [rows] carry the fraud probability directly;
    // otherwise class 1 is the fraud column
    let column = if classes >= 2 { 1 } else { 0 };
    Ok((0..rows)
        .map(|r| data[r * classes + column] as f64)
        .collect())
}

/// Extract probabilities from seq(map(int64, float)), one map per row.
/// This is used by CatBoost and LightGBM ONNX exports with ZipMap.
fn extract_from_sequence_map(output: &ort::value::DynValue, rows: usize) -> Result<Vec<f64>> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    if maps.len() != rows {
        anyhow::bail!("Sequence has {} maps for {} rows", maps.len(), rows);
    }

    maps.iter()
        .map(|map_value| {
            let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
            positive_class_probability(&kv_pairs)
        })
        .collect()
}

/// Class 1 probability, or the complement of class 0 if only that is present
fn positive_class_probability(kv_pairs: &[(i64, f32)]) -> Result<f64> {
    if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 1) {
        return Ok(*prob as f64);
    }
    if let Some((_, prob)) = kv_pairs.iter().find(|(class_id, _)| *class_id == 0) {
        return Ok(1.0 - *prob as f64);
    }
    Err(anyhow::anyhow!("No probability found in map"))
}

/// Extract predicted labels from an int64 label tensor
fn extract_labels(output: &ort::value::DynValue, rows: usize) -> Result<Vec<u8>> {
    let (_, data) = output
        .try_extract_tensor::<i64>()
        .context("Label output is not an int64 tensor")?;
    to_binary_labels(data, rows)
}

fn to_binary_labels(data: &[i64], rows: usize) -> Result<Vec<u8>> {
    if data.len() != rows {
        anyhow::bail!("Label output has {} values for {} rows", data.len(), rows);
    }
    data.iter()
        .map(|&label| match label {
            0 => Ok(0),
            1 => Ok(1),
            other => Err(anyhow::anyhow!("Model produced non-binary label {}", other)),
        })
        .collect()
}

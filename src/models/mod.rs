//! ML model components
//!
//! The rest of the crate only sees [`FraudModel`]; the ONNX artifact and its
//! sidecar metadata stay behind this module.

pub mod cache;
pub mod inference;
pub mod loader;
pub mod metadata;

#[cfg(test)]
pub mod stub;

pub use cache::shared_model;
pub use inference::OnnxModel;
pub use loader::ModelLoader;
pub use metadata::ModelMetadata;

use anyhow::Result;
use ndarray::Array2;

/// Inference capability of a pre-trained binary fraud classifier.
///
/// Both operations take the full `[rows, features]` matrix, columns in
/// [`feature_names`](FraudModel::feature_names) order, and return one value
/// per row in row order.
pub trait FraudModel: Send + Sync {
    /// Human-readable model name
    fn name(&self) -> &str;

    /// Feature columns the model was trained on, in input order
    fn feature_names(&self) -> &[String];

    /// Predicted class per row (0 = legitimate, 1 = fraudulent)
    fn predict(&self, features: &Array2<f32>) -> Result<Vec<u8>>;

    /// Probability of the fraudulent class per row
    fn predict_proba(&self, features: &Array2<f32>) -> Result<Vec<f64>>;
}

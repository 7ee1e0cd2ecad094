//! Deterministic in-process model for tests

use super::FraudModel;
use anyhow::{bail, Result};
use ndarray::Array2;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Logistic model over the row sum: `p = sigmoid(bias + weight * sum(row))`.
///
/// With the default bias an all-zero row scores about 0.001.
pub struct StubModel {
    features: Vec<String>,
    bias: f64,
    weight: f64,
    /// Number of `predict` + `predict_proba` calls
    pub calls: AtomicUsize,
    /// Reject any matrix with this many rows or more
    pub fail_at_rows: Option<usize>,
}

impl StubModel {
    pub fn new(features: &[&str]) -> Self {
        Self {
            features: features.iter().map(|f| f.to_string()).collect(),
            bias: -6.9,
            weight: 1.0,
            calls: AtomicUsize::new(0),
            fail_at_rows: None,
        }
    }

    /// The 28 anonymized credit-card features
    pub fn credit_card() -> Self {
        let names: Vec<String> = (1..=28).map(|i| format!("V{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        Self::new(&refs)
    }

    pub fn failing_at(mut self, rows: usize) -> Self {
        self.fail_at_rows = Some(rows);
        self
    }

    fn probabilities(&self, features: &Array2<f32>) -> Result<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if features.ncols() != self.features.len() {
            bail!(
                "expected {} features, got {}",
                self.features.len(),
                features.ncols()
            );
        }
        if let Some(limit) = self.fail_at_rows {
            if features.nrows() >= limit {
                bail!("stub rejects batches of {} rows", features.nrows());
            }
        }

        Ok(features
            .rows()
            .into_iter()
            .map(|row| {
                let z = self.bias + self.weight * row.iter().map(|&v| v as f64).sum::<f64>();
                1.0 / (1.0 + (-z).exp())
            })
            .collect())
    }
}

impl FraudModel for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict(&self, features: &Array2<f32>) -> Result<Vec<u8>> {
        Ok(self
            .probabilities(features)?
            .into_iter()
            .map(|p| u8::from(p >= 0.5))
            .collect())
    }

    fn predict_proba(&self, features: &Array2<f32>) -> Result<Vec<f64>> {
        self.probabilities(features)
    }
}

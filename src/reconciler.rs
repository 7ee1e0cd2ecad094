//! Schema reconciliation between an upload and the model's feature contract.
//!
//! Reconciliation drops the ground-truth label column, then projects the
//! upload onto the model's feature list in the model's order. Missing
//! features are always rejected; extra columns are dropped.

use crate::error::ScoringError;
use crate::types::transaction::TransactionBatch;
use tracing::debug;

/// Conventional name of the ground-truth column in training-derived uploads
pub const DEFAULT_LABEL_COLUMN: &str = "Class";

/// Aligns uploaded batches with the model's expected feature columns
#[derive(Debug, Clone)]
pub struct SchemaReconciler {
    label_column: String,
}

impl SchemaReconciler {
    pub fn new(label_column: impl Into<String>) -> Self {
        Self {
            label_column: label_column.into(),
        }
    }

    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    /// Produce a new batch whose columns are exactly `expected_features`, in order.
    pub fn reconcile<S: AsRef<str>>(
        &self,
        batch: &TransactionBatch,
        expected_features: &[S],
    ) -> Result<TransactionBatch, ScoringError> {
        if batch.is_empty() {
            return Err(ScoringError::EmptyBatch);
        }

        // The label column only counts as a feature if the model asks for it
        let label_is_feature = expected_features
            .iter()
            .any(|f| f.as_ref() == self.label_column);
        if batch.has_column(&self.label_column) && !label_is_feature {
            debug!(column = %self.label_column, "Dropping label column before scoring");
        }

        let mut indices = Vec::with_capacity(expected_features.len());
        let mut missing = Vec::new();
        for feature in expected_features {
            match batch.column_index(feature.as_ref()) {
                Some(index) => indices.push(index),
                None => missing.push(feature.as_ref().to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(ScoringError::SchemaMismatch { missing });
        }

        let dropped = batch
            .columns()
            .iter()
            .filter(|c| *c != &self.label_column)
            .filter(|c| !expected_features.iter().any(|f| f.as_ref() == c.as_str()))
            .count();
        if dropped > 0 {
            debug!(dropped = dropped, "Dropping non-feature columns");
        }

        Ok(batch.project(&indices))
    }

    /// Like [`reconcile`](Self::reconcile), but the upload must hold exactly one row.
    pub fn reconcile_single<S: AsRef<str>>(
        &self,
        batch: &TransactionBatch,
        expected_features: &[S],
    ) -> Result<TransactionBatch, ScoringError> {
        if batch.row_count() != 1 {
            return Err(ScoringError::RowCountMismatch {
                expected: 1,
                actual: batch.row_count(),
            });
        }
        self.reconcile(batch, expected_features)
    }
}

impl Default for SchemaReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_COLUMN)
    }
}

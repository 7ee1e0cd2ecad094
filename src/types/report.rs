//! Scoring report emitted alongside the augmented table

use crate::types::prediction::{PredictionResult, ScoringSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row the model flagged as fraudulent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedRow {
    /// Zero-based row position in the upload
    pub row: usize,
    /// Fraud probability assigned by the model
    pub fraud_probability: f64,
}

/// Machine-readable summary of one scored upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringReport {
    /// Unique report identifier
    pub report_id: String,

    /// Name of the upload (usually the file name)
    pub source: String,

    /// Model that produced the predictions
    pub model: String,

    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,

    /// Verdict counts
    pub summary: ScoringSummary,

    /// Share of rows flagged as fraud
    pub fraud_rate: f64,

    /// Rows flagged as fraud, in upload order
    pub flagged: Vec<FlaggedRow>,
}

impl ScoringReport {
    /// Create a new report for a scored upload
    pub fn new(source: String, model: String, summary: ScoringSummary) -> Self {
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            source,
            model,
            generated_at: Utc::now(),
            fraud_rate: summary.fraud_rate(),
            summary,
            flagged: Vec::new(),
        }
    }

    /// Attach the rows flagged as fraud
    pub fn with_flagged(mut self, predictions: &[PredictionResult]) -> Self {
        self.flagged = predictions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.verdict.is_fraud())
            .map(|(row, p)| FlaggedRow {
                row,
                fraud_probability: p.fraud_probability,
            })
            .collect();
        self
    }
}

//! Per-row predictions and batch summaries

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary verdict produced by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Legit,
    Fraud,
}

impl Verdict {
    /// Map a model label (0 = legitimate, 1 = fraudulent)
    pub fn from_label(label: u8) -> Option<Self> {
        match label {
            0 => Some(Verdict::Legit),
            1 => Some(Verdict::Fraud),
            _ => None,
        }
    }

    /// Numeric label as the model emits it
    pub fn label(self) -> u8 {
        match self {
            Verdict::Legit => 0,
            Verdict::Fraud => 1,
        }
    }

    pub fn is_fraud(self) -> bool {
        self == Verdict::Fraud
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Legit => f.write_str("Legit"),
            Verdict::Fraud => f.write_str("Fraud"),
        }
    }
}

/// Model output for one row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted class
    pub verdict: Verdict,
    /// Probability of the fraudulent class (0.0 - 1.0)
    pub fraud_probability: f64,
}

impl PredictionResult {
    pub fn new(verdict: Verdict, fraud_probability: f64) -> Self {
        Self {
            verdict,
            fraud_probability,
        }
    }

    /// Confidence in the predicted verdict: the fraud probability for a
    /// fraud verdict, its complement for a legitimate one.
    pub fn confidence(&self) -> f64 {
        match self.verdict {
            Verdict::Fraud => self.fraud_probability,
            Verdict::Legit => 1.0 - self.fraud_probability,
        }
    }
}

/// Aggregate verdict counts over a scored batch.
///
/// Always derived from predictions, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoringSummary {
    pub fraud_count: usize,
    pub legit_count: usize,
    pub total: usize,
}

impl ScoringSummary {
    /// Count verdicts over a set of predictions
    pub fn from_predictions(predictions: &[PredictionResult]) -> Self {
        let fraud_count = predictions.iter().filter(|p| p.verdict.is_fraud()).count();
        let legit_count = predictions.len() - fraud_count;

        Self {
            fraud_count,
            legit_count,
            total: fraud_count + legit_count,
        }
    }

    /// Share of rows flagged as fraud
    pub fn fraud_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.fraud_count as f64 / self.total as f64
        }
    }
}

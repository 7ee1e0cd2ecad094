//! Synthetic single-transaction samples for quick model checks

use crate::types::transaction::{TransactionBatch, TransactionRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which representative transaction to simulate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleKind {
    /// Every feature at 0
    Legit,
    /// Every feature at 1
    Fraud,
}

impl SampleKind {
    /// Value assigned to every feature
    pub fn fill_value(self) -> f64 {
        match self {
            SampleKind::Legit => 0.0,
            SampleKind::Fraud => 1.0,
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleKind::Legit => f.write_str("legit"),
            SampleKind::Fraud => f.write_str("fraud"),
        }
    }
}

impl FromStr for SampleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legit" | "legitimate" => Ok(SampleKind::Legit),
            "fraud" | "fraudulent" => Ok(SampleKind::Fraud),
            other => Err(format!("unknown sample kind '{}'", other)),
        }
    }
}

/// Build a sample record over the model's features
pub fn sample_record<S: AsRef<str>>(kind: SampleKind, features: &[S]) -> TransactionRecord {
    TransactionRecord::filled(features, kind.fill_value())
}

/// Build a one-row batch holding the sample record
pub fn sample_batch<S: AsRef<str>>(kind: SampleKind, features: &[S]) -> TransactionBatch {
    TransactionBatch::from_record(&sample_record(kind, features))
}

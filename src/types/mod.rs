//! Type definitions for the batch scorer

pub mod prediction;
pub mod report;
pub mod transaction;

pub use prediction::{PredictionResult, ScoringSummary, Verdict};
pub use report::{FlaggedRow, ScoringReport};
pub use transaction::{TransactionBatch, TransactionRecord};

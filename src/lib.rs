//! Fraud Batch Scorer Library
//!
//! Scores uploaded transaction tables against a pre-trained binary fraud
//! classifier: reconcile the upload with the model's feature contract, run
//! one vectorized inference pass, and hand back the augmented table with a
//! verdict summary.

pub mod config;
pub mod csv_io;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod reconciler;
pub mod samples;
pub mod scorer;
pub mod types;

pub use config::AppConfig;
pub use error::ScoringError;
pub use models::FraudModel;
pub use pipeline::{ExportedUpload, ScoringOutcome, ScoringPipeline, SingleVerdict};
pub use reconciler::SchemaReconciler;
pub use samples::SampleKind;
pub use scorer::{BatchScorer, ScoredBatch};
pub use types::{PredictionResult, ScoringSummary, TransactionBatch, TransactionRecord, Verdict};

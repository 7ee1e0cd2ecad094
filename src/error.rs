//! Error taxonomy for reconciliation and scoring requests

use thiserror::Error;

/// Failure of a single upload or sample request.
///
/// None of these are fatal to the process; the caller reports the message
/// and is ready for the next request.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("required feature columns missing from upload: {}", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("expected exactly {expected} row(s), upload contains {actual}")]
    RowCountMismatch { expected: usize, actual: usize },

    #[error("upload contains no rows")]
    EmptyBatch,

    #[error("model inference failed: {cause}")]
    InferenceFailure { cause: String },

    #[error("column '{0}' appears more than once in the header")]
    DuplicateColumn(String),

    #[error("row {row} has {actual} cells, header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ScoringError {
    /// Wrap any error raised by the model capability.
    pub fn inference(cause: impl std::fmt::Display) -> Self {
        ScoringError::InferenceFailure {
            cause: cause.to_string(),
        }
    }

    /// Short stable name used as a metrics key and log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ScoringError::SchemaMismatch { .. } => "schema_mismatch",
            ScoringError::RowCountMismatch { .. } => "row_count_mismatch",
            ScoringError::EmptyBatch => "empty_batch",
            ScoringError::InferenceFailure { .. } => "inference_failure",
            ScoringError::DuplicateColumn(_) => "duplicate_column",
            ScoringError::RaggedRow { .. } => "ragged_row",
            ScoringError::Csv(_) => "csv",
            ScoringError::Report(_) => "report",
            ScoringError::Io(_) => "io",
        }
    }
}

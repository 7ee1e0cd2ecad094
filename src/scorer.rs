//! Batch scoring over reconciled uploads

use crate::error::ScoringError;
use crate::models::FraudModel;
use crate::types::prediction::{PredictionResult, ScoringSummary, Verdict};
use crate::types::transaction::TransactionBatch;
use ndarray::Array2;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// A reconciled batch with one prediction per row, in row order
#[derive(Debug, Clone)]
pub struct ScoredBatch {
    batch: TransactionBatch,
    predictions: Vec<PredictionResult>,
}

impl ScoredBatch {
    /// Reconciled feature columns, untouched by scoring
    pub fn batch(&self) -> &TransactionBatch {
        &self.batch
    }

    pub fn predictions(&self) -> &[PredictionResult] {
        &self.predictions
    }

    pub fn row_count(&self) -> usize {
        self.predictions.len()
    }

    /// Rows paired with their predictions
    pub fn iter(&self) -> impl Iterator<Item = (&[String], &PredictionResult)> {
        self.batch
            .rows()
            .iter()
            .map(Vec::as_slice)
            .zip(self.predictions.iter())
    }

    /// Recompute verdict counts
    pub fn summary(&self) -> ScoringSummary {
        ScoringSummary::from_predictions(&self.predictions)
    }
}

/// Applies the model to whole batches at once
#[derive(Clone)]
pub struct BatchScorer {
    model: Arc<dyn FraudModel>,
}

impl BatchScorer {
    pub fn new(model: Arc<dyn FraudModel>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &dyn FraudModel {
        self.model.as_ref()
    }

    /// Score a reconciled batch.
    ///
    /// The model is invoked once for labels and once for probabilities over
    /// the full batch. Any failure, including a single bad cell, fails the
    /// whole batch.
    pub fn score(
        &self,
        batch: &TransactionBatch,
    ) -> Result<(ScoredBatch, ScoringSummary), ScoringError> {
        if batch.is_empty() {
            return Err(ScoringError::EmptyBatch);
        }
        self.check_columns(batch)?;

        let start = Instant::now();
        let features = to_feature_matrix(batch)?;
        let rows = batch.row_count();

        let labels = self
            .model
            .predict(&features)
            .map_err(ScoringError::inference)?;
        let probabilities = self
            .model
            .predict_proba(&features)
            .map_err(ScoringError::inference)?;

        if labels.len() != rows || probabilities.len() != rows {
            return Err(ScoringError::inference(format!(
                "model returned {} labels and {} probabilities for {} rows",
                labels.len(),
                probabilities.len(),
                rows
            )));
        }

        let predictions = labels
            .into_iter()
            .zip(probabilities)
            .enumerate()
            .map(|(row, (label, probability))| -> Result<PredictionResult, ScoringError> {
                let verdict = Verdict::from_label(label).ok_or_else(|| {
                    ScoringError::inference(format!("row {}: label {} is not 0 or 1", row, label))
                })?;
                if !(0.0..=1.0).contains(&probability) {
                    return Err(ScoringError::inference(format!(
                        "row {}: probability {} outside [0, 1]",
                        row, probability
                    )));
                }
                Ok(PredictionResult::new(verdict, probability))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let scored = ScoredBatch {
            batch: batch.clone(),
            predictions,
        };
        let summary = scored.summary();

        debug!(
            model = %self.model.name(),
            rows = rows,
            fraud = summary.fraud_count,
            elapsed_us = start.elapsed().as_micros() as u64,
            "Batch scored"
        );

        Ok((scored, summary))
    }

    /// The batch must already be in the model's feature order
    fn check_columns(&self, batch: &TransactionBatch) -> Result<(), ScoringError> {
        let expected = self.model.feature_names();
        if batch.columns() == expected {
            return Ok(());
        }

        let missing: Vec<String> = expected
            .iter()
            .filter(|f| !batch.has_column(f))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ScoringError::SchemaMismatch { missing });
        }
        Err(ScoringError::inference(
            "batch columns are not in the model's feature order",
        ))
    }
}

/// Parse a batch into a `[rows, features]` matrix.
///
/// Non-numeric or non-finite cells are an inference failure for the whole batch.
pub fn to_feature_matrix(batch: &TransactionBatch) -> Result<Array2<f32>, ScoringError> {
    let (rows, cols) = (batch.row_count(), batch.column_count());
    let mut data = Vec::with_capacity(rows * cols);

    for (row, cells) in batch.rows().iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            let value = cell
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    ScoringError::inference(format!(
                        "non-numeric value '{}' in column '{}' at row {}",
                        cell,
                        batch.columns()[col],
                        row
                    ))
                })?;
            data.push(value);
        }
    }

    Array2::from_shape_vec((rows, cols), data).map_err(ScoringError::inference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stub::StubModel;
    use std::sync::atomic::Ordering;

    fn batch(columns: &[&str], rows: &[&[&str]]) -> TransactionBatch {
        TransactionBatch::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_score_preserves_rows_and_order() {
        let model = Arc::new(StubModel::new(&["V1", "V2"]));
        let scorer = BatchScorer::new(model.clone());
        let input = batch(
            &["V1", "V2"],
            &[&["0", "0"], &["5", "5"], &["0.5", "-1"], &["4", "4"]],
        );

        let (scored, summary) = scorer.score(&input).unwrap();

        assert_eq!(scored.row_count(), input.row_count());
        assert_eq!(scored.batch(), &input);
        let verdicts: Vec<Verdict> = scored.predictions().iter().map(|p| p.verdict).collect();
        assert_eq!(
            verdicts,
            vec![Verdict::Legit, Verdict::Fraud, Verdict::Legit, Verdict::Fraud]
        );
        assert_eq!(summary.fraud_count, 2);
        assert_eq!(summary.legit_count, 2);
        assert_eq!(summary.total, 4);
        // One label pass and one probability pass for the whole batch
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_probabilities_in_range() {
        let scorer = BatchScorer::new(Arc::new(StubModel::new(&["V1"])));
        let input = batch(&["V1"], &[&["-1000"], &["0"], &["1000"], &["6.9"]]);

        let (scored, summary) = scorer.score(&input).unwrap();
        for prediction in scored.predictions() {
            assert!((0.0..=1.0).contains(&prediction.fraud_probability));
        }
        assert_eq!(summary.fraud_count + summary.legit_count, summary.total);
        assert_eq!(summary.total, 4);
    }

    #[test]
    fn test_non_numeric_cell_fails_whole_batch() {
        let model = Arc::new(StubModel::new(&["V1", "V2"]));
        let scorer = BatchScorer::new(model.clone());
        let input = batch(&["V1", "V2"], &[&["0", "1"], &["abc", "2"], &["3", "4"]]);

        let err = scorer.score(&input).unwrap_err();
        match err {
            ScoringError::InferenceFailure { cause } => {
                assert!(cause.contains("'abc'"));
                assert!(cause.contains("'V1'"));
                assert!(cause.contains("row 1"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_model_error_is_inference_failure() {
        let scorer = BatchScorer::new(Arc::new(StubModel::new(&["V1"]).failing_at(2)));
        let input = batch(&["V1"], &[&["0"], &["1"]]);

        let err = scorer.score(&input).unwrap_err();
        assert!(matches!(err, ScoringError::InferenceFailure { .. }));
        assert!(err.to_string().contains("stub rejects"));
    }

    #[test]
    fn test_unreconciled_batch_rejected() {
        let scorer = BatchScorer::new(Arc::new(StubModel::new(&["V1", "V2"])));

        let missing = batch(&["V1"], &[&["0"]]);
        assert!(matches!(
            scorer.score(&missing).unwrap_err(),
            ScoringError::SchemaMismatch { .. }
        ));

        let reordered = batch(&["V2", "V1"], &[&["0", "0"]]);
        assert!(matches!(
            scorer.score(&reordered).unwrap_err(),
            ScoringError::InferenceFailure { .. }
        ));
    }

    /// Returns fixed outputs regardless of input
    struct MisbehavingModel {
        features: Vec<String>,
        labels: Vec<u8>,
        probabilities: Vec<f64>,
    }

    impl MisbehavingModel {
        fn new(labels: &[u8], probabilities: &[f64]) -> Self {
            Self {
                features: vec!["V1".to_string()],
                labels: labels.to_vec(),
                probabilities: probabilities.to_vec(),
            }
        }
    }

    impl FraudModel for MisbehavingModel {
        fn name(&self) -> &str {
            "misbehaving"
        }

        fn feature_names(&self) -> &[String] {
            &self.features
        }

        fn predict(&self, _features: &Array2<f32>) -> anyhow::Result<Vec<u8>> {
            Ok(self.labels.clone())
        }

        fn predict_proba(&self, _features: &Array2<f32>) -> anyhow::Result<Vec<f64>> {
            Ok(self.probabilities.clone())
        }
    }

    type ScoreResult = Result<(ScoredBatch, ScoringSummary), ScoringError>;

    fn score_with(model: MisbehavingModel) -> ScoreResult {
        BatchScorer::new(Arc::new(model)).score(&batch(&["V1"], &[&["0"], &["1"]]))
    }

    fn assert_inference_failure(result: ScoreResult, needle: &str) {
        match result {
            Err(ScoringError::InferenceFailure { cause }) => {
                assert!(cause.contains(needle), "cause '{}' lacks '{}'", cause, needle)
            }
            other => panic!("expected inference failure, got {:?}", other),
        }
    }

    #[test]
    fn test_well_formed_outputs_accepted() {
        let (scored, summary) = score_with(MisbehavingModel::new(&[0, 1], &[0.0, 1.0])).unwrap();
        assert_eq!(scored.predictions()[1].verdict, Verdict::Fraud);
        assert_eq!(summary.total, 2);
    }

    #[test]
    fn test_label_outside_binary_rejected() {
        assert_inference_failure(
            score_with(MisbehavingModel::new(&[0, 2], &[0.1, 0.9])),
            "row 1: label 2",
        );
    }

    #[test]
    fn test_probability_outside_unit_interval_rejected() {
        assert_inference_failure(
            score_with(MisbehavingModel::new(&[0, 1], &[0.1, 1.5])),
            "row 1: probability 1.5",
        );
        assert_inference_failure(
            score_with(MisbehavingModel::new(&[0, 0], &[-0.2, 0.1])),
            "row 0: probability -0.2",
        );
    }

    #[test]
    fn test_nan_probability_rejected() {
        assert_inference_failure(
            score_with(MisbehavingModel::new(&[0, 1], &[0.1, f64::NAN])),
            "probability NaN",
        );
    }

    #[test]
    fn test_short_outputs_rejected() {
        assert_inference_failure(
            score_with(MisbehavingModel::new(&[0], &[0.1, 0.2])),
            "1 labels and 2 probabilities for 2 rows",
        );
        assert_inference_failure(
            score_with(MisbehavingModel::new(&[0, 1], &[0.1])),
            "2 labels and 1 probabilities for 2 rows",
        );
    }

    #[test]
    fn test_feature_matrix_rejects_non_finite() {
        let input = batch(&["V1"], &[&["NaN"]]);
        assert!(to_feature_matrix(&input).is_err());

        let input = batch(&["V1", "V2"], &[&["1.5", "-2"]]);
        let matrix = to_feature_matrix(&input).unwrap();
        assert_eq!(matrix.dim(), (1, 2));
        assert_eq!(matrix[[0, 1]], -2.0);
    }
}

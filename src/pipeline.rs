//! Request boundary: one upload or one sample in, one outcome or error out.
//!
//! Each call is independent. A failed request is logged and counted, and the
//! pipeline stays ready for the next one.

use crate::config::{AppConfig, LabelFormat};
use crate::csv_io::{self, OutputColumns};
use crate::error::ScoringError;
use crate::metrics::ScoringMetrics;
use crate::models::FraudModel;
use crate::reconciler::SchemaReconciler;
use crate::samples::{sample_record, SampleKind};
use crate::scorer::{BatchScorer, ScoredBatch};
use crate::types::prediction::{PredictionResult, ScoringSummary, Verdict};
use crate::types::report::ScoringReport;
use crate::types::transaction::{TransactionBatch, TransactionRecord};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Result of scoring one upload
#[derive(Debug, Clone)]
pub struct ScoringOutcome {
    pub scored: ScoredBatch,
    pub summary: ScoringSummary,
    pub report: ScoringReport,
}

/// Files written for one scored upload
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedUpload {
    pub table: PathBuf,
    pub report: Option<PathBuf>,
}

/// Verdict for a single transaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingleVerdict {
    pub verdict: Verdict,
    pub fraud_probability: f64,
    /// Confidence in `verdict`, in [0, 1]
    pub confidence: f64,
}

impl From<PredictionResult> for SingleVerdict {
    fn from(prediction: PredictionResult) -> Self {
        Self {
            verdict: prediction.verdict,
            fraud_probability: prediction.fraud_probability,
            confidence: prediction.confidence(),
        }
    }
}

/// Reconcile-then-score pipeline around a shared model
pub struct ScoringPipeline {
    reconciler: SchemaReconciler,
    scorer: BatchScorer,
    label_format: LabelFormat,
    columns: OutputColumns,
    metrics: Arc<ScoringMetrics>,
}

impl ScoringPipeline {
    pub fn new(model: Arc<dyn FraudModel>, config: &AppConfig) -> Self {
        Self {
            reconciler: SchemaReconciler::new(config.schema.label_column.clone()),
            scorer: BatchScorer::new(model),
            label_format: config.output.label_format,
            columns: OutputColumns {
                prediction: config.output.prediction_column.clone(),
                probability: config.output.probability_column.clone(),
            },
            metrics: Arc::new(ScoringMetrics::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<ScoringMetrics> {
        &self.metrics
    }

    /// Feature columns the model expects, in order
    pub fn feature_names(&self) -> &[String] {
        self.scorer.model().feature_names()
    }

    /// Parse, reconcile and score one CSV upload
    pub fn score_upload<R: Read>(
        &self,
        source: &str,
        reader: R,
    ) -> Result<ScoringOutcome, ScoringError> {
        let start = Instant::now();
        let result = csv_io::read_batch(reader).and_then(|batch| self.score_batch(source, &batch));
        self.finish(source, start, result)
    }

    /// Read, reconcile and score one CSV file.
    ///
    /// An unreadable file is counted as a failed request like any other.
    pub fn score_file(&self, path: &Path) -> Result<ScoringOutcome, ScoringError> {
        let source = path.display().to_string();
        let start = Instant::now();
        let result =
            csv_io::read_batch_from_path(path).and_then(|batch| self.score_batch(&source, &batch));
        self.finish(&source, start, result)
    }

    /// Reconcile and score an already-parsed batch
    pub fn score_batch(
        &self,
        source: &str,
        batch: &TransactionBatch,
    ) -> Result<ScoringOutcome, ScoringError> {
        let reconciled = self.reconciler.reconcile(batch, self.feature_names())?;
        let (scored, summary) = self.scorer.score(&reconciled)?;

        let report = ScoringReport::new(
            source.to_string(),
            self.scorer.model().name().to_string(),
            summary,
        )
        .with_flagged(scored.predictions());

        Ok(ScoringOutcome {
            scored,
            summary,
            report,
        })
    }

    /// Score a single transaction record
    pub fn score_record(&self, record: &TransactionRecord) -> Result<SingleVerdict, ScoringError> {
        let start = Instant::now();
        let batch = TransactionBatch::from_record(record);
        let result = self
            .reconciler
            .reconcile_single(&batch, self.feature_names())
            .and_then(|reconciled| self.scorer.score(&reconciled))
            .and_then(|(scored, _)| {
                scored
                    .predictions()
                    .first()
                    .copied()
                    .map(SingleVerdict::from)
                    .ok_or(ScoringError::EmptyBatch)
            });

        match &result {
            Ok(single) => {
                let summary = ScoringSummary {
                    fraud_count: usize::from(single.verdict.is_fraud()),
                    legit_count: usize::from(!single.verdict.is_fraud()),
                    total: 1,
                };
                self.metrics.record_batch(start.elapsed(), &summary);
                info!(
                    verdict = %single.verdict,
                    fraud_probability = single.fraud_probability,
                    confidence = single.confidence,
                    "Record scored"
                );
            }
            Err(e) => {
                self.metrics.record_failure(e.kind());
                warn!(kind = e.kind(), error = %e, "Record scoring failed");
            }
        }
        result
    }

    /// Score one of the built-in synthetic samples
    pub fn score_sample(&self, kind: SampleKind) -> Result<SingleVerdict, ScoringError> {
        let record = sample_record(kind, self.feature_names());
        self.score_record(&record)
    }

    /// Write the augmented table in the configured label format
    pub fn write_scored<W: Write>(
        &self,
        writer: W,
        outcome: &ScoringOutcome,
    ) -> Result<(), ScoringError> {
        csv_io::write_scored(writer, &outcome.scored, self.label_format, &self.columns)
    }

    /// Write `<stem>_scored.csv`, and `<stem>_report.json` when asked, into `output_dir`.
    ///
    /// A write failure is logged and counted against the upload.
    pub fn export(
        &self,
        outcome: &ScoringOutcome,
        output_dir: &Path,
        stem: &str,
        write_report: bool,
    ) -> Result<ExportedUpload, ScoringError> {
        let result = self.write_outputs(outcome, output_dir, stem, write_report);
        match &result {
            Ok(exported) => {
                info!(
                    source = %outcome.report.source,
                    table = %exported.table.display(),
                    "Scored table written"
                );
            }
            Err(e) => {
                self.metrics.record_failure(e.kind());
                warn!(source = %outcome.report.source, kind = e.kind(), error = %e, "Export failed");
            }
        }
        result
    }

    fn write_outputs(
        &self,
        outcome: &ScoringOutcome,
        output_dir: &Path,
        stem: &str,
        write_report: bool,
    ) -> Result<ExportedUpload, ScoringError> {
        let table = output_dir.join(format!("{}_scored.csv", stem));
        csv_io::write_scored_to_path(&table, &outcome.scored, self.label_format, &self.columns)?;

        let report = if write_report {
            let path = output_dir.join(format!("{}_report.json", stem));
            let json = serde_json::to_string_pretty(&outcome.report)?;
            std::fs::write(&path, json)?;
            Some(path)
        } else {
            None
        };

        Ok(ExportedUpload { table, report })
    }

    fn finish(
        &self,
        source: &str,
        start: Instant,
        result: Result<ScoringOutcome, ScoringError>,
    ) -> Result<ScoringOutcome, ScoringError> {
        let elapsed = start.elapsed();
        match &result {
            Ok(outcome) => {
                self.metrics.record_batch(elapsed, &outcome.summary);
                info!(
                    source = %source,
                    rows = outcome.summary.total,
                    fraud = outcome.summary.fraud_count,
                    legit = outcome.summary.legit_count,
                    elapsed_us = elapsed.as_micros() as u64,
                    "Upload scored"
                );
            }
            Err(e) => {
                self.metrics.record_failure(e.kind());
                warn!(source = %source, kind = e.kind(), error = %e, "Upload rejected");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stub::StubModel;
    use std::sync::atomic::Ordering;

    fn pipeline() -> ScoringPipeline {
        ScoringPipeline::new(Arc::new(StubModel::credit_card()), &AppConfig::default())
    }

    fn header(extra_front: &[&str], extra_back: &[&str]) -> String {
        let mut columns: Vec<String> = extra_front.iter().map(|s| s.to_string()).collect();
        columns.extend((1..=28).map(|i| format!("V{}", i)));
        columns.extend(extra_back.iter().map(|s| s.to_string()));
        columns.join(",")
    }

    fn row(value: &str, extra_front: &[&str], extra_back: &[&str]) -> String {
        let mut cells: Vec<String> = extra_front.iter().map(|s| s.to_string()).collect();
        cells.extend(std::iter::repeat(value.to_string()).take(28));
        cells.extend(extra_back.iter().map(|s| s.to_string()));
        cells.join(",")
    }

    #[test]
    fn test_all_zero_row_is_legit_at_baseline() {
        let pipeline = pipeline();
        let csv = format!("{}\n{}\n", header(&[], &["Class"]), row("0", &[], &["1"]));

        let outcome = pipeline.score_upload("zeros.csv", csv.as_bytes()).unwrap();
        let prediction = outcome.scored.predictions()[0];

        assert_eq!(prediction.verdict, Verdict::Legit);
        // Stub baseline is sigmoid(-6.9)
        assert!(prediction.fraud_probability < 0.01);
        assert!(prediction.confidence() > 0.99);
    }

    #[test]
    fn test_class_column_absent_from_output() {
        let pipeline = pipeline();
        let csv = format!(
            "{}\n{}\n{}\n",
            header(&["Class", "Time"], &["Amount"]),
            row("0", &["0", "12"], &["9.99"]),
            row("1", &["1", "13"], &["250.0"]),
        );

        let outcome = pipeline.score_upload("labelled.csv", csv.as_bytes()).unwrap();
        let mut out = Vec::new();
        pipeline.write_scored(&mut out, &outcome).unwrap();
        let text = String::from_utf8(out).unwrap();
        let out_header: Vec<&str> = text.lines().next().unwrap().split(',').collect();

        assert!(!out_header.contains(&"Class"));
        let expected: Vec<String> = (1..=28)
            .map(|i| format!("V{}", i))
            .chain(["Prediction".to_string(), "Fraud_Probability".to_string()])
            .collect();
        assert_eq!(out_header, expected);
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_non_numeric_value_fails_whole_batch() {
        let pipeline = pipeline();
        let csv = format!(
            "{}\n{}\n{}\n{}\n",
            header(&[], &[]),
            row("0", &[], &[]),
            row("oops", &[], &[]),
            row("1", &[], &[]),
        );

        let err = pipeline.score_upload("bad.csv", csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ScoringError::InferenceFailure { .. }));
        assert_eq!(pipeline.metrics().batches_failed.load(Ordering::Relaxed), 1);
        assert_eq!(pipeline.metrics().rows_scored.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_missing_feature_is_rejected() {
        let pipeline = pipeline();
        let csv = "V1,V2,Class\n0,0,0\n";

        let err = pipeline.score_upload("partial.csv", csv.as_bytes()).unwrap_err();
        match err {
            ScoringError::SchemaMismatch { missing } => {
                assert_eq!(missing.len(), 26);
                assert_eq!(missing[0], "V3");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_empty_upload() {
        let pipeline = pipeline();
        let csv = format!("{}\n", header(&[], &[]));
        let err = pipeline.score_upload("empty.csv", csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ScoringError::EmptyBatch));
    }

    #[test]
    fn test_failure_leaves_pipeline_usable() {
        let pipeline = pipeline();
        assert!(pipeline.score_upload("bad.csv", "V1\n0\n".as_bytes()).is_err());

        let csv = format!("{}\n{}\n{}\n", header(&[], &[]), row("0", &[], &[]), row("1", &[], &[]));
        let outcome = pipeline.score_upload("good.csv", csv.as_bytes()).unwrap();

        assert_eq!(outcome.summary.total, 2);
        assert_eq!(outcome.summary.fraud_count, 1);
        assert_eq!(outcome.report.flagged.len(), 1);
        assert_eq!(outcome.report.flagged[0].row, 1);
        assert_eq!(pipeline.metrics().batches_scored.load(Ordering::Relaxed), 1);
        assert_eq!(pipeline.metrics().batches_failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_unreadable_file_is_counted() {
        let pipeline = pipeline();
        let dir = tempfile::tempdir().unwrap();

        let err = pipeline.score_file(&dir.path().join("missing.csv")).unwrap_err();
        assert!(matches!(err, ScoringError::Io(_)));
        assert_eq!(pipeline.metrics().failures_by_kind().get("io"), Some(&1));

        let path = dir.path().join("good.csv");
        let csv = format!("{}\n{}\n", header(&[], &["Class"]), row("1", &[], &["1"]));
        std::fs::write(&path, csv).unwrap();

        let outcome = pipeline.score_file(&path).unwrap();
        assert_eq!(outcome.summary.fraud_count, 1);
        assert_eq!(outcome.report.source, path.display().to_string());
    }

    #[test]
    fn test_export_failure_does_not_block_next_upload() {
        let pipeline = pipeline();
        let dir = tempfile::tempdir().unwrap();
        let csv = format!("{}\n{}\n{}\n", header(&[], &[]), row("0", &[], &[]), row("1", &[], &[]));
        let outcome = pipeline.score_upload("upload.csv", csv.as_bytes()).unwrap();

        // A regular file where the output directory should be
        let blocked = dir.path().join("not_a_dir");
        std::fs::write(&blocked, "").unwrap();
        let err = pipeline.export(&outcome, &blocked, "upload", true).unwrap_err();
        assert!(matches!(err, ScoringError::Io(_)));
        assert_eq!(pipeline.metrics().batches_failed.load(Ordering::Relaxed), 1);

        let exported = pipeline.export(&outcome, dir.path(), "upload", true).unwrap();
        assert_eq!(exported.table, dir.path().join("upload_scored.csv"));
        let table = std::fs::read_to_string(&exported.table).unwrap();
        assert_eq!(table.lines().count(), 3);

        let report_path = exported.report.unwrap();
        let report: ScoringReport =
            serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.flagged.len(), 1);
    }

    #[test]
    fn test_export_without_report() {
        let pipeline = pipeline();
        let dir = tempfile::tempdir().unwrap();
        let csv = format!("{}\n{}\n", header(&[], &[]), row("0", &[], &[]));
        let outcome = pipeline.score_upload("upload.csv", csv.as_bytes()).unwrap();

        let exported = pipeline.export(&outcome, dir.path(), "upload", false).unwrap();
        assert!(exported.report.is_none());
        assert!(!dir.path().join("upload_report.json").exists());
    }

    #[test]
    fn test_samples() {
        let pipeline = pipeline();

        let legit = pipeline.score_sample(SampleKind::Legit).unwrap();
        assert_eq!(legit.verdict, Verdict::Legit);
        assert!((legit.confidence - (1.0 - legit.fraud_probability)).abs() < 1e-12);

        let fraud = pipeline.score_sample(SampleKind::Fraud).unwrap();
        assert_eq!(fraud.verdict, Verdict::Fraud);
        assert!((fraud.confidence - fraud.fraud_probability).abs() < 1e-12);
    }

    #[test]
    fn test_record_missing_feature() {
        let pipeline = pipeline();
        let record = TransactionRecord::new().with("V1", 0.0);

        let err = pipeline.score_record(&record).unwrap_err();
        assert!(matches!(err, ScoringError::SchemaMismatch { .. }));
    }
}

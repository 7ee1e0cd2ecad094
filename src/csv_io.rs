//! CSV upload parsing and scored-table export

use crate::config::LabelFormat;
use crate::error::ScoringError;
use crate::scorer::ScoredBatch;
use crate::types::transaction::TransactionBatch;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Names of the two columns appended to the scored table
#[derive(Debug, Clone)]
pub struct OutputColumns {
    pub prediction: String,
    pub probability: String,
}

impl Default for OutputColumns {
    fn default() -> Self {
        Self {
            prediction: "Prediction".to_string(),
            probability: "Fraud_Probability".to_string(),
        }
    }
}

/// Parse a comma-separated upload with a header row.
///
/// Row width is checked by `TransactionBatch::new`, so a short or long row
/// surfaces as `RaggedRow` rather than a generic CSV error.
pub fn read_batch<R: Read>(reader: R) -> Result<TransactionBatch, ScoringError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();

    let rows = rdr
        .records()
        .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
        .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;

    TransactionBatch::new(columns, rows)
}

/// Parse an upload from a file
pub fn read_batch_from_path<P: AsRef<Path>>(path: P) -> Result<TransactionBatch, ScoringError> {
    let file = File::open(path)?;
    read_batch(file)
}

/// Write the reconciled columns plus the prediction and probability columns
pub fn write_scored<W: Write>(
    writer: W,
    scored: &ScoredBatch,
    label_format: LabelFormat,
    columns: &OutputColumns,
) -> Result<(), ScoringError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let header = scored
        .batch()
        .columns()
        .iter()
        .map(String::as_str)
        .chain([columns.prediction.as_str(), columns.probability.as_str()]);
    wtr.write_record(header)?;

    for (cells, prediction) in scored.iter() {
        let label = match label_format {
            LabelFormat::Numeric => prediction.verdict.label().to_string(),
            LabelFormat::Text => prediction.verdict.to_string(),
        };
        let probability = prediction.fraud_probability.to_string();

        let record = cells
            .iter()
            .map(String::as_str)
            .chain([label.as_str(), probability.as_str()]);
        wtr.write_record(record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the scored table to a file
pub fn write_scored_to_path<P: AsRef<Path>>(
    path: P,
    scored: &ScoredBatch,
    label_format: LabelFormat,
    columns: &OutputColumns,
) -> Result<(), ScoringError> {
    let file = File::create(path)?;
    write_scored(file, scored, label_format, columns)
}

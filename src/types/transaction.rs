//! Transaction records and uploaded batches

use crate::error::ScoringError;
use std::collections::HashSet;

/// A single transaction as an ordered feature-name to value mapping.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionRecord {
    fields: Vec<(String, f64)>,
}

impl TransactionRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from feature names, all set to the same value
    pub fn filled<S: AsRef<str>>(features: &[S], value: f64) -> Self {
        Self {
            fields: features
                .iter()
                .map(|name| (name.as_ref().to_string(), value))
                .collect(),
        }
    }

    /// Set a feature value, appending it if the feature is new
    pub fn set(&mut self, name: &str, value: f64) {
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some(field) => field.1 = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Builder-style variant of [`set`](Self::set)
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.set(name, value);
        self
    }

    /// Get a feature value by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Feature names in record order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Feature values in record order
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.fields.iter().map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// An ordered collection of rows sharing one header.
///
/// Cells stay as raw text until inference so that a non-numeric value in a
/// feature column surfaces as an inference failure rather than a parse error
/// at upload time.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBatch {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TransactionBatch {
    /// Create a batch, rejecting duplicate column names and ragged rows
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, ScoringError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(ScoringError::DuplicateColumn(column.clone()));
            }
        }

        for (row, cells) in rows.iter().enumerate() {
            if cells.len() != columns.len() {
                return Err(ScoringError::RaggedRow {
                    row,
                    expected: columns.len(),
                    actual: cells.len(),
                });
            }
        }

        Ok(Self { columns, rows })
    }

    /// Build a one-row batch from a record
    pub fn from_record(record: &TransactionRecord) -> Self {
        Self {
            columns: record.names().map(str::to_string).collect(),
            rows: vec![record.values().map(|v| v.to_string()).collect()],
        }
    }

    /// Column names in header order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Raw cell values, row-major
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column in the header
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Whether the header contains a column
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Project the batch onto the given column positions, in the given order.
    ///
    /// Callers guarantee the indices are in range and distinct.
    pub(crate) fn project(&self, indices: &[usize]) -> Self {
        Self {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }
}

//! Fatal ingestion errors
//!
//! Anything in here aborts the run before any analyzer executes and before any
//! artifact is written.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported file format: '{extension}'. Supported formats: csv, parquet")]
    UnsupportedFormat { extension: String },

    #[error("Missing required column(s): {}. Available columns: {}", .missing.join(", "), .available.join(", "))]
    MissingColumns {
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("Dataset is empty: {detail}")]
    EmptyDataset { detail: String },

    #[error("Invalid value in column '{column}' at row {row}: {detail}")]
    InvalidValue {
        column: String,
        row: usize,
        detail: String,
    },

    #[error("Duplicate post_id '{post_id}' at rows {first_row} and {second_row}")]
    DuplicatePostId {
        post_id: String,
        first_row: usize,
        second_row: usize,
    },
}

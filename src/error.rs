//! Error types for trueno-metrics
//!
//! The core pipeline (normalize, join, cache, downsample, export) never fails.
//! Errors originate at the ingest boundary or from configuration.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// trueno-metrics error types
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before reaching the pipeline (missing columns, wrong file type)
    #[error("Format error: {0}")]
    Format(String),

    /// Numeric cell could not be coerced (strict coercion only)
    #[error("Cannot coerce {column} = {raw:?} to a number (row {row})")]
    Coercion {
        /// Zero-based data row index
        row: usize,
        /// Column name
        column: String,
        /// Raw cell text
        raw: String,
    },

    /// Malformed CSV
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON (configuration) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration or argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

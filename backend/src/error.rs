//! Error types for the Nexus ETL pipeline.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`SourceError`] - Spreadsheet reading errors
//! - [`StoreError`] - Table store errors
//! - [`ValidationError`] - Record validation errors
//! - [`PipelineError`] - Top-level stage orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// Source Errors
// =============================================================================

/// Errors while reading the source spreadsheet.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file does not exist.
    #[error("Source file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to read the file bytes.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The content is not tabular data.
    #[error("Invalid spreadsheet format: {0}")]
    ParseError(String),

    /// Empty file.
    #[error("Spreadsheet file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in spreadsheet")]
    NoHeaders,
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors from the table store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The table has never been written.
    #[error("Table not found: {0}")]
    TableMissing(String),

    /// IO error on a table file.
    #[error("Table '{table}' IO error: {source}")]
    Io {
        table: String,
        #[source]
        source: std::io::Error,
    },

    /// A stored line is not a JSON object.
    #[error("Table '{table}' line {line} is corrupt: {message}")]
    Corrupt {
        table: String,
        line: usize,
        message: String,
    },

    /// Failed to convert between rows and typed records.
    #[error("Table '{table}' record conversion failed: {source}")]
    Record {
        table: String,
        #[source]
        source: serde_json::Error,
    },
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors at the record validation boundary.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Schema validation failed.
    #[error("Validation failed: {errors:?}")]
    SchemaError { errors: Vec<String> },

    /// Invalid field value.
    #[error("Invalid value for field '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level stage errors.
///
/// Every variant is fatal for the stage that raised it. Row-level problems
/// never reach this type; they are recorded in the transform quality report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input file missing.
    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Input file present but unreadable as tabular data.
    #[error("Failed to read source '{}': {message}", path.display())]
    SourceReadError { path: PathBuf, message: String },

    /// A required upstream table has never been written.
    #[error("Required table '{table}' does not exist")]
    SourceTableMissing { table: String },

    /// Table store failure.
    #[error("Store error: {0}")]
    Store(StoreError),

    /// A derived record failed its output contract.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to render command output.
    #[error("Output error: {0}")]
    Output(String),
}

impl PipelineError {
    /// Wrap a source error with the path it was read from.
    pub fn from_source(path: impl Into<PathBuf>, err: SourceError) -> Self {
        let path = path.into();
        match err {
            SourceError::NotFound(p) => Self::SourceNotFound(p),
            other => Self::SourceReadError {
                path,
                message: other.to_string(),
            },
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::SourceNotFound(_) => 2,
            Self::SourceReadError { .. } => 3,
            Self::SourceTableMissing { .. } => 4,
            Self::Store(_) => 5,
            Self::Validation(_) | Self::Config(_) | Self::Output(_) => 1,
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TableMissing(table) => Self::SourceTableMissing { table },
            other => Self::Store(other),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for source reading.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for pipeline stages.
pub type PipelineResult<T> = Result<T, PipelineError>;

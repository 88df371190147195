//! # Nexus - household deposit balance ETL
//!
//! Nexus turns a monthly household balance spreadsheet extract into the
//! tables behind the deposit dashboard. Three stages run in order, each
//! reading what the previous one wrote to the lakehouse:
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Spreadsheet │────▶│   Ingest    │────▶│  Transform   │────▶│  Aggregate   │
//! │ (xlsx/CSV)  │     │ raw batches │     │ households + │     │ facts + KPIs │
//! └─────────────┘     │  (append)   │     │ counterparty │     │ (over/append)│
//!                     └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nexus::{run, PipelineConfig, Stage};
//!
//! let config = PipelineConfig::new("./lakehouse", "./data/household-balance-report.csv");
//! let report = run(Stage::All, &config)?;
//! println!("{} households", report.transform.map(|t| t.households).unwrap_or(0));
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Pipeline configuration and column aliases
//! - [`logging`] - Text / JSON log setup
//! - [`models`] - Typed records and raw rows
//! - [`parser`] - Spreadsheet parsing with auto-detection
//! - [`validation`] - JSON Schema and money precision checks
//! - [`store`] - Lakehouse table store
//! - [`ingest`] - Ingest stage
//! - [`transform`] - Cleaning, quality report and transform stage
//! - [`aggregate`] - Facts and KPI stage
//! - [`pipeline`] - Stage runner
//! - [`query`] - Downstream read helpers

// Core modules
pub mod config;
pub mod error;
pub mod logging;
pub mod models;

// Parsing and validation
pub mod parser;
pub mod validation;

// Storage
pub mod store;

// Stages
pub mod aggregate;
pub mod ingest;
pub mod pipeline;
pub mod transform;

// Read side
pub mod query;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{
    PipelineError,
    PipelineResult,
    SourceError,
    StoreError,
    ValidationError,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{PipelineConfig, SourceColumns};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CounterpartyRecord,
    CounterpartyStatus,
    DimensionType,
    FactSnapshot,
    HouseholdRecord,
    KpiName,
    KpiObservation,
    Row,
    TeamId,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes_auto,
    parse_file_auto,
    parse_str,
    parse_workbook,
    ParseResult,
    SourceFormat,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{validate_household, validate_kpi_observation};

// =============================================================================
// Re-exports - Store
// =============================================================================

pub use store::{LakehouseStore, TableRef, TableScan, TableStore, Zone};

// =============================================================================
// Re-exports - Stages
// =============================================================================

pub use aggregate::{run_aggregate, AggregateSummary};
pub use ingest::{ingest, ingest_at, IngestSummary};
pub use pipeline::{run, RunReport, Stage};
pub use transform::{clean_currency, resolve_counterparty, run_transform, QualityReport, TransformSummary};

// =============================================================================
// Re-exports - Query
// =============================================================================

pub use query::{latest_bank_kpis, read_table_or_empty, render_query, scan_expression, KpiSummary};

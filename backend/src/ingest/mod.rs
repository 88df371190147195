//! Ingest stage: spreadsheet extract → raw batch.
//!
//! Every row of one run gets the same `batch_id`, `source_filename` and
//! `ingested_at`, then the batch is appended to `raw.raw_household_balances`.
//! Prior batches are never touched.

use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Row, BATCH_ID_COLUMN, INGESTED_AT_COLUMN, SOURCE_FILENAME_COLUMN};
use crate::parser::parse_file_auto;
use crate::store::{TableStore, RAW_HOUSEHOLD_BALANCES};

/// Outcome of one ingest run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    /// `None` when the source had a header but no data rows.
    pub batch_id: Option<String>,
    pub rows_ingested: usize,
    pub source_filename: String,
    pub ingested_at: DateTime<Utc>,
}

/// Ingest the configured source, stamped with the current time.
pub fn ingest<S: TableStore + ?Sized>(config: &PipelineConfig, store: &S) -> PipelineResult<IngestSummary> {
    ingest_at(config, store, Utc::now())
}

/// Ingest the configured source with an explicit capture timestamp.
pub fn ingest_at<S: TableStore + ?Sized>(
    config: &PipelineConfig,
    store: &S,
    ingested_at: DateTime<Utc>,
) -> PipelineResult<IngestSummary> {
    let path = config.source_path.as_path();
    info!("ingest_start source={}", path.display());

    if !path.exists() {
        return Err(PipelineError::SourceNotFound(path.to_path_buf()));
    }

    let parsed = parse_file_auto(path).map_err(|e| PipelineError::from_source(path, e))?;

    let source_filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let missing = config.columns.missing_required(&parsed.headers);
    if !missing.is_empty() {
        return Err(PipelineError::SourceReadError {
            path: path.to_path_buf(),
            message: format!("missing required column(s): {}", missing.join(", ")),
        });
    }

    if parsed.records.is_empty() {
        info!(
            "ingest_empty_batch source={} columns={}",
            source_filename,
            parsed.headers.len()
        );
        return Ok(IngestSummary {
            batch_id: None,
            rows_ingested: 0,
            source_filename,
            ingested_at,
        });
    }

    let batch_id = Uuid::new_v4().to_string();
    let stamp = ingested_at.to_rfc3339_opts(SecondsFormat::Micros, true);

    let rows: Vec<Row> = parsed
        .records
        .into_iter()
        .map(|mut row| {
            row.insert(BATCH_ID_COLUMN.to_string(), Value::String(batch_id.clone()));
            row.insert(SOURCE_FILENAME_COLUMN.to_string(), Value::String(source_filename.clone()));
            row.insert(INGESTED_AT_COLUMN.to_string(), Value::String(stamp.clone()));
            row
        })
        .collect();

    let rows_ingested = store.append_rows(&RAW_HOUSEHOLD_BALANCES, &rows)?;

    info!(
        "ingest_complete batch_id={} rows={} source={} format={} encoding={} delimiter={:?}",
        batch_id,
        rows_ingested,
        source_filename,
        parsed.format.as_str(),
        parsed.encoding,
        parsed.delimiter
    );

    Ok(IngestSummary {
        batch_id: Some(batch_id),
        rows_ingested,
        source_filename,
        ingested_at,
    })
}

//! Transform stage: latest raw batch → normalized tables.
//!
//! - Cleaning: pure currency, text and officer-column functions
//! - Normalize: one batch of raw rows to households and counterparties
//! - Quality: per-row data-quality report

pub mod cleaning;
pub mod normalize;
pub mod quality;

pub use cleaning::{clean_currency, resolve_counterparty, ResolvedCounterparty};
pub use normalize::{normalize_batch, NormalizedBatch};
pub use quality::{DataQualityIssue, IssueKind, QualityReport};

use log::info;
use serde::Serialize;
use serde_json::Value;

use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::models::BATCH_ID_COLUMN;
use crate::store::{replace_records, TableStore, COUNTERPARTIES, HOUSEHOLDS, RAW_HOUSEHOLD_BALANCES};

/// Outcome of one transform run.
#[derive(Debug, Clone, Serialize)]
pub struct TransformSummary {
    pub batch_id: String,
    pub households: usize,
    pub counterparties: usize,
    pub report: QualityReport,
}

/// Identifier of the batch appended last to the raw table.
///
/// `None` when the raw table exists but holds no rows.
pub fn latest_batch_id<S: TableStore + ?Sized>(store: &S) -> PipelineResult<Option<String>> {
    let mut latest = None;
    for row in store.scan(&RAW_HOUSEHOLD_BALANCES)?.select(&[BATCH_ID_COLUMN]) {
        if let Some(id) = row?.get(BATCH_ID_COLUMN).and_then(Value::as_str) {
            latest = Some(id.to_string());
        }
    }
    Ok(latest)
}

/// Normalize the most recent raw batch and overwrite both normalized tables.
///
/// Returns `None` without writing when the raw table is empty.
pub fn run_transform<S: TableStore + ?Sized>(
    config: &PipelineConfig,
    store: &S,
) -> PipelineResult<Option<TransformSummary>> {
    info!("transform_start table={}", RAW_HOUSEHOLD_BALANCES);

    let Some(batch_id) = latest_batch_id(store)? else {
        info!("transform_empty_batch table={}", RAW_HOUSEHOLD_BALANCES);
        return Ok(None);
    };

    let rows = store
        .scan(&RAW_HOUSEHOLD_BALANCES)?
        .filter_eq(BATCH_ID_COLUMN, Value::String(batch_id.clone()))
        .collect_rows()?;

    let batch = normalize_batch(&rows, &config.columns);
    batch.report.log_summary(&batch_id);

    let households = replace_records(store, &HOUSEHOLDS, &batch.households)?;
    let counterparties = replace_records(store, &COUNTERPARTIES, &batch.counterparties)?;

    info!(
        "transform_complete batch_id={} raw_rows={} households={} counterparties={}",
        batch_id,
        rows.len(),
        households,
        counterparties
    );

    Ok(Some(TransformSummary {
        batch_id,
        households,
        counterparties,
        report: batch.report,
    }))
}

//! Read contract for downstream consumers of the derived tables.
//!
//! Dashboards query tables through SQL templates that name the table as a
//! `{table}` placeholder. [`render_query`] substitutes a scan expression for
//! it, and [`scan_expression`] builds one for a stored table. Reads of tables
//! that were never written come back empty instead of failing.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::models::{DimensionType, KpiName, KpiObservation, Row, ALL_DIMENSION_VALUE};
use crate::store::{TableRef, TableStore, AGG_KPI_DAILY};

/// Placeholder replaced by [`render_query`].
pub const TABLE_PLACEHOLDER: &str = "{table}";

/// Substitute every `{table}` placeholder in a query template.
pub fn render_query(template: &str, scan_expr: &str) -> String {
    template.replace(TABLE_PLACEHOLDER, scan_expr)
}

/// SQL table function reading a stored table's JSON Lines file.
pub fn scan_expression<S: TableStore + ?Sized>(store: &S, table: &TableRef) -> String {
    let path = store.location(table).display().to_string();
    format!("read_json_auto('{}')", path.replace('\'', "''"))
}

/// Every row of a table, or nothing when the table was never written.
pub fn read_table_or_empty<S: TableStore + ?Sized>(store: &S, table: &TableRef) -> StoreResult<Vec<Row>> {
    match store.scan(table) {
        Ok(scan) => scan.collect_rows(),
        Err(StoreError::TableMissing(_)) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Bank-wide KPI values at the latest report date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    /// `None` when no KPI has been recorded yet.
    pub report_date: Option<NaiveDate>,
    pub total_deposits: Decimal,
    pub net_flow_mom: Decimal,
    pub liquidity_ratio: Decimal,
}

impl Default for KpiSummary {
    fn default() -> Self {
        Self {
            report_date: None,
            total_deposits: Decimal::ZERO,
            net_flow_mom: Decimal::ZERO,
            liquidity_ratio: Decimal::ZERO,
        }
    }
}

impl KpiSummary {
    fn set(&mut self, name: KpiName, value: Decimal) {
        match name {
            KpiName::TotalDeposits => self.total_deposits = value,
            KpiName::NetFlowMom => self.net_flow_mom = value,
            KpiName::LiquidityRatio => self.liquidity_ratio = value,
        }
    }
}

/// Latest `Bank`/`All` KPI values. Zeros when the KPI table is missing or
/// empty. With several observations for one KPI on the latest date, the
/// last one written wins.
pub fn latest_bank_kpis<S: TableStore + ?Sized>(store: &S) -> StoreResult<KpiSummary> {
    let observations: Vec<KpiObservation> = match store.scan(&AGG_KPI_DAILY) {
        Ok(scan) => scan.decode::<KpiObservation>().collect::<StoreResult<_>>()?,
        Err(StoreError::TableMissing(_)) => return Ok(KpiSummary::default()),
        Err(e) => return Err(e),
    };

    let Some(latest) = observations.iter().map(|o| o.report_date).max() else {
        return Ok(KpiSummary::default());
    };

    let mut summary = KpiSummary {
        report_date: Some(latest),
        ..KpiSummary::default()
    };
    for obs in observations.iter().filter(|o| {
        o.report_date == latest && o.dimension_type == DimensionType::Bank && o.dimension_value == ALL_DIMENSION_VALUE
    }) {
        summary.set(obs.kpi_name, obs.value);
    }

    Ok(summary)
}

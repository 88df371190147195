//! Domain models for the Nexus ETL pipeline.
//!
//! The raw layer is schema-free: a [`Row`] maps column names to dynamic JSON
//! values. Every layer after it uses the typed records below:
//!
//! - [`HouseholdRecord`] - Cleaned current-state balance snapshot
//! - [`CounterpartyRecord`] - Officer reference derived from the batch
//! - [`FactSnapshot`] - Monthly performance fact per household
//! - [`KpiObservation`] - One metric value for one date/dimension slice

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A dynamically-typed table row.
pub type Row = Map<String, Value>;

// =============================================================================
// Raw layer provenance columns
// =============================================================================

/// Batch identifier shared by every row of one ingestion run.
pub const BATCH_ID_COLUMN: &str = "batch_id";

/// Name of the spreadsheet file the row came from.
pub const SOURCE_FILENAME_COLUMN: &str = "source_filename";

/// Capture timestamp (RFC 3339, UTC) shared by every row of one run.
pub const INGESTED_AT_COLUMN: &str = "ingested_at";

// =============================================================================
// Normalized layer
// =============================================================================

/// A cleaned household balance snapshot.
///
/// Balances are absent when the source cell had no numeric content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdRecord {
    /// 6 to 10 digit household identifier.
    pub id: String,
    pub name: String,
    pub counterparty_code: Option<String>,
    pub balance_current: Option<Decimal>,
    pub balance_prior_month: Option<Decimal>,
    pub balance_ytd_start: Option<Decimal>,
    pub as_of_date: NaiveDate,
}

/// Team an officer belongs to.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TeamId {
    /// Business Banking
    BB,
    /// OCF
    OCF,
    /// Personal Banking
    PB,
}

/// Whether an officer is still servicing households.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CounterpartyStatus {
    #[default]
    Active,
    Inactive,
}

/// An officer reference derived from (code, name) pairs in the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterpartyRecord {
    pub code: String,
    pub name: Option<String>,
    /// Always `None` until a team mapping source exists.
    pub team_id: Option<TeamId>,
    pub status: CounterpartyStatus,
}

impl CounterpartyRecord {
    /// A new active officer with no team assignment.
    pub fn new(code: String, name: Option<String>) -> Self {
        Self {
            code,
            name,
            team_id: None,
            status: CounterpartyStatus::Active,
        }
    }
}

// =============================================================================
// Derived layer
// =============================================================================

/// Monthly performance fact for one household.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSnapshot {
    /// `YYYYMM`
    pub period_key: u32,
    pub entity_key: String,
    pub counterparty_key: Option<String>,
    pub total_deposits: Option<Decimal>,
    pub net_flow_mom: Option<Decimal>,
    pub net_flow_ytd: Option<Decimal>,
}

/// Name of a pre-computed KPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiName {
    TotalDeposits,
    NetFlowMom,
    LiquidityRatio,
}

impl KpiName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TotalDeposits => "total_deposits",
            Self::NetFlowMom => "net_flow_mom",
            Self::LiquidityRatio => "liquidity_ratio",
        }
    }
}

/// Slice a KPI is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimensionType {
    Bank,
    Team,
    Officer,
}

/// Dimension value used for bank-wide observations.
pub const ALL_DIMENSION_VALUE: &str = "All";

/// One KPI value for one report date and dimension slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiObservation {
    pub report_date: NaiveDate,
    pub kpi_name: KpiName,
    pub dimension_type: DimensionType,
    pub dimension_value: String,
    pub value: Decimal,
}

impl KpiObservation {
    /// A bank-wide (`Bank` / `All`) observation.
    pub fn bank_wide(report_date: NaiveDate, kpi_name: KpiName, value: Decimal) -> Self {
        Self {
            report_date,
            kpi_name,
            dimension_type: DimensionType::Bank,
            dimension_value: ALL_DIMENSION_VALUE.to_string(),
            value,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Aggregate stage: households → monthly facts and bank-wide KPIs.
//!
//! Facts overwrite `derived.fact_household_monthly`; KPI observations are
//! appended to `derived.agg_kpi_daily`, so each run adds to the history.

use chrono::{Datelike, NaiveDate};
use log::{error, info};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::PipelineResult;
use crate::models::{FactSnapshot, HouseholdRecord, KpiName, KpiObservation};
use crate::store::{
    append_records, read_records, replace_records, TableStore, AGG_KPI_DAILY, FACT_HOUSEHOLD_MONTHLY, HOUSEHOLDS,
};
use crate::validation::{validate_kpi_observation, MONEY_SCALE};

/// Outcome of one aggregate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregateSummary {
    pub facts: usize,
    pub kpis: usize,
}

/// `YYYYMM` period key of a date.
pub fn period_key(date: NaiveDate) -> u32 {
    date.year() as u32 * 100 + date.month()
}

fn difference(a: Option<Decimal>, b: Option<Decimal>) -> Option<Decimal> {
    Some(a? - b?)
}

/// One fact per household, in household order.
pub fn build_facts(households: &[HouseholdRecord]) -> Vec<FactSnapshot> {
    households
        .iter()
        .map(|h| FactSnapshot {
            period_key: period_key(h.as_of_date),
            entity_key: h.id.clone(),
            counterparty_key: h.counterparty_code.clone(),
            total_deposits: h.balance_current,
            net_flow_mom: difference(h.balance_current, h.balance_prior_month),
            net_flow_ytd: difference(h.balance_current, h.balance_ytd_start),
        })
        .collect()
}

/// Bank-wide `total_deposits` per as-of date, oldest date first.
///
/// Absent balances are skipped; a date where every balance is absent
/// reports `0.00`.
pub fn bank_kpis(households: &[HouseholdRecord]) -> Vec<KpiObservation> {
    let mut totals: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for h in households {
        let total = totals.entry(h.as_of_date).or_insert(Decimal::ZERO);
        if let Some(balance) = h.balance_current {
            *total += balance;
        }
    }

    totals
        .into_iter()
        .map(|(date, mut total)| {
            total.rescale(MONEY_SCALE);
            KpiObservation::bank_wide(date, KpiName::TotalDeposits, total)
        })
        .collect()
}

/// Derive facts and KPIs from the current household snapshot and write them.
pub fn run_aggregate<S: TableStore + ?Sized>(store: &S) -> PipelineResult<AggregateSummary> {
    info!("aggregate_start table={}", HOUSEHOLDS);

    let households: Vec<HouseholdRecord> = read_records(store, &HOUSEHOLDS)?;

    let facts = build_facts(&households);
    let kpis = bank_kpis(&households);

    // Nothing is written unless every observation is valid.
    for kpi in &kpis {
        if let Err(e) = validate_kpi_observation(kpi) {
            error!(
                "kpi_rejected report_date={} kpi_name={} error={}",
                kpi.report_date,
                kpi.kpi_name.as_str(),
                e
            );
            return Err(e.into());
        }
    }

    let facts_written = replace_records(store, &FACT_HOUSEHOLD_MONTHLY, &facts)?;
    let kpis_written = append_records(store, &AGG_KPI_DAILY, &kpis)?;

    info!(
        "aggregate_complete households={} facts={} kpis={}",
        households.len(),
        facts_written,
        kpis_written
    );

    Ok(AggregateSummary {
        facts: facts_written,
        kpis: kpis_written,
    })
}

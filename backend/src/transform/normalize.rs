//! Raw batch rows → normalized household and counterparty sets.
//!
//! [`normalize_batch`] is pure: it never touches the store, so it can be run
//! on hand-built rows.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::HashSet;

use super::cleaning::{clean_currency, has_content, is_totals_id, resolve_counterparty, value_to_text};
use super::quality::{IssueKind, QualityReport};
use crate::config::SourceColumns;
use crate::models::{CounterpartyRecord, HouseholdRecord, Row, INGESTED_AT_COLUMN};
use crate::validation::validate_household;

/// Normalized output of one batch.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub households: Vec<HouseholdRecord>,
    pub counterparties: Vec<CounterpartyRecord>,
    pub report: QualityReport,
}

/// Clean, validate and deduplicate one batch of raw rows.
///
/// Rows are processed in order. The first row carrying a household id decides
/// its fate: later rows with that id are reported as duplicates whether or not
/// the first one passed validation. Counterparties keep the first occurrence
/// of each resolved (code, name) pair.
pub fn normalize_batch(rows: &[Row], columns: &SourceColumns) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_counterparties: HashSet<(String, Option<String>)> = HashSet::new();

    for (idx, row) in rows.iter().enumerate() {
        let row_no = idx + 1;
        batch.report.rows_scanned += 1;

        let id = value_to_text(SourceColumns::lookup(row, &columns.household_id));
        if is_totals_id(id.as_deref()) {
            batch.report.record(row_no, IssueKind::TotalsRow, id.as_deref(), None, "footer row dropped");
            continue;
        }

        let Some(name) = value_to_text(SourceColumns::lookup(row, &columns.household_name)) else {
            batch.report.record(
                row_no,
                IssueKind::EmptyName,
                id.as_deref(),
                Some("household_name"),
                "household name missing",
            );
            continue;
        };

        let code_cell = value_to_text(SourceColumns::lookup(row, &columns.officer_code));
        let name_cell = value_to_text(SourceColumns::lookup(row, &columns.officer_name));
        let officer = resolve_counterparty(code_cell.as_deref(), name_cell.as_deref());
        if officer.swapped {
            batch.report.record(
                row_no,
                IssueKind::SwappedFields,
                id.as_deref(),
                Some("officer_code"),
                format!("officer code and name swapped, code resolved to {:?}", officer.code),
            );
        }

        if let Some(code) = &officer.code {
            if seen_counterparties.insert((code.clone(), officer.name.clone())) {
                batch
                    .counterparties
                    .push(CounterpartyRecord::new(code.clone(), officer.name.clone()));
            }
        }

        // First occurrence owns the id even if it later fails validation.
        if let Some(household_id) = &id {
            if !seen_ids.insert(household_id.clone()) {
                batch.report.record(
                    row_no,
                    IssueKind::DuplicateId,
                    Some(household_id.as_str()),
                    Some("household_id"),
                    "later occurrence dropped",
                );
                continue;
            }
        }

        let mut balance = |column: &'static str, aliases: &[String]| -> Option<Decimal> {
            let cell = SourceColumns::lookup(row, aliases);
            let cleaned = cell.and_then(clean_currency);
            if cleaned.is_none() && has_content(cell) {
                batch.report.record(
                    row_no,
                    IssueKind::UnparseableAmount,
                    id.as_deref(),
                    Some(column),
                    format!("no numeric content in {}", cell.map(Value::to_string).unwrap_or_default()),
                );
            }
            cleaned
        };

        let balance_current = balance("balance_current", &columns.balance_current);
        let balance_prior_month = balance("balance_prior_month", &columns.balance_prior_month);
        let balance_ytd_start = balance("balance_ytd_start", &columns.balance_ytd_start);

        let Some(as_of_date) = capture_date(row) else {
            batch.report.record(
                row_no,
                IssueKind::InvalidRecord,
                id.as_deref(),
                Some(INGESTED_AT_COLUMN),
                "missing or unreadable capture timestamp",
            );
            continue;
        };

        let candidate = json!({
            "id": &id,
            "name": &name,
            "counterparty_code": &officer.code,
            "balance_current": balance_current,
            "balance_prior_month": balance_prior_month,
            "balance_ytd_start": balance_ytd_start,
            "as_of_date": as_of_date,
        });

        let household = match validate_household(&candidate) {
            Ok(household) => household,
            Err(e) => {
                batch
                    .report
                    .record(row_no, IssueKind::InvalidRecord, id.as_deref(), None, e.to_string());
                continue;
            }
        };

        batch.households.push(household);
    }

    batch.report.rows_accepted = batch.households.len();
    batch
}

/// UTC calendar date of the row's `ingested_at` stamp.
fn capture_date(row: &Row) -> Option<NaiveDate> {
    let stamp = row.get(INGESTED_AT_COLUMN)?.as_str()?;
    DateTime::parse_from_rfc3339(stamp)
        .ok()
        .map(|ts| ts.with_timezone(&Utc).date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CounterpartyStatus;
    use std::str::FromStr;

    fn raw(id: Value, name: Value, code: &str, officer: &str, current: Value) -> Row {
        json!({
            "Household ID": id,
            "Household Name": name,
            "Officer Code": code,
            "Officer Name": officer,
            "Current Month-end Deposit Balance": current,
            "Prior Month-end Deposit Balance": "$145,000.00",
            "Prior Year-end Deposit Balance": "$120,000.00",
            "batch_id": "b1",
            "ingested_at": "2024-01-15T23:30:00.000000Z"
        })
        .as_object()
        .unwrap()
        .clone()
    }

    fn money(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_clean_rows_become_households() {
        let rows = vec![
            raw(json!("100001"), json!("Smith Family"), "1001", "Sarah Jenkins", json!("$150,000.00")),
            raw(json!("100002"), json!("Jones Family"), "1002", "Tom Reed", json!("(500.00)")),
        ];

        let batch = normalize_batch(&rows, &SourceColumns::default());

        assert_eq!(batch.households.len(), 2);
        let smith = &batch.households[0];
        assert_eq!(smith.id, "100001");
        assert_eq!(smith.counterparty_code.as_deref(), Some("1001"));
        assert_eq!(smith.balance_current, Some(money("150000.00")));
        assert_eq!(smith.balance_prior_month, Some(money("145000.00")));
        assert_eq!(smith.as_of_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(batch.households[1].balance_current, Some(money("-500.00")));
        assert!(batch.report.is_clean());
        assert_eq!(batch.report.rows_accepted, 2);
    }

    #[test]
    fn test_totals_and_empty_names_dropped() {
        let rows = vec![
            raw(json!("100001"), json!("Smith Family"), "1001", "Sarah Jenkins", json!("10")),
            raw(json!("100002"), Value::Null, "1001", "Sarah Jenkins", json!("20")),
            raw(json!("100003"), json!("   "), "1001", "Sarah Jenkins", json!("30")),
            raw(json!("TOTALS"), json!("All households"), "", "", json!("60")),
        ];

        let batch = normalize_batch(&rows, &SourceColumns::default());

        assert_eq!(batch.households.len(), 1);
        assert_eq!(batch.report.count(IssueKind::EmptyName), 2);
        assert_eq!(batch.report.count(IssueKind::TotalsRow), 1);
        assert_eq!(batch.report.rows_scanned, 4);
    }

    #[test]
    fn test_swapped_officer_columns_resolved() {
        let rows = vec![raw(json!("100001"), json!("Smith Family"), "Sarah Jenkins", "1001", json!("10"))];

        let batch = normalize_batch(&rows, &SourceColumns::default());

        assert_eq!(batch.households[0].counterparty_code.as_deref(), Some("1001"));
        assert_eq!(batch.counterparties[0].code, "1001");
        assert_eq!(batch.counterparties[0].name.as_deref(), Some("Sarah Jenkins"));
        assert_eq!(batch.report.count(IssueKind::SwappedFields), 1);
    }

    #[test]
    fn test_counterparties_deduplicated_in_first_seen_order() {
        let rows = vec![
            raw(json!("100001"), json!("A"), "1002", "Tom Reed", json!("1")),
            raw(json!("100002"), json!("B"), "1001", "Sarah Jenkins", json!("2")),
            raw(json!("100003"), json!("C"), "Tom Reed", "1002", json!("3")),
        ];

        let batch = normalize_batch(&rows, &SourceColumns::default());

        let codes: Vec<&str> = batch.counterparties.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["1002", "1001"]);
        assert!(batch.counterparties.iter().all(|c| c.team_id.is_none()));
        assert!(batch.counterparties.iter().all(|c| c.status == CounterpartyStatus::Active));
    }

    #[test]
    fn test_rows_without_officer_code_add_no_counterparty() {
        let rows = vec![raw(json!("100001"), json!("Smith Family"), "", "", json!("10"))];

        let batch = normalize_batch(&rows, &SourceColumns::default());

        assert_eq!(batch.households.len(), 1);
        assert_eq!(batch.households[0].counterparty_code, None);
        assert!(batch.counterparties.is_empty());
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let rows = vec![
            raw(json!("100001"), json!("First"), "1001", "Sarah Jenkins", json!("10")),
            raw(json!("100001"), json!("Second"), "1001", "Sarah Jenkins", json!("20")),
        ];

        let batch = normalize_batch(&rows, &SourceColumns::default());

        assert_eq!(batch.households.len(), 1);
        assert_eq!(batch.households[0].name, "First");
        assert_eq!(batch.report.count(IssueKind::DuplicateId), 1);
    }

    #[test]
    fn test_invalid_first_occurrence_still_owns_the_id() {
        let rows = vec![
            raw(
                json!("100001"),
                json!("First"),
                "1001",
                "Sarah Jenkins",
                json!("$99,999,999,999,999,999.00"),
            ),
            raw(json!("100001"), json!("Second"), "1001", "Sarah Jenkins", json!("20")),
        ];

        let batch = normalize_batch(&rows, &SourceColumns::default());

        assert!(batch.households.is_empty());
        assert_eq!(batch.report.count(IssueKind::InvalidRecord), 1);
        assert_eq!(batch.report.count(IssueKind::DuplicateId), 1);
        assert_eq!(batch.report.issues[1].row, 2);
    }

    #[test]
    fn test_unparseable_amount_degrades_to_absent() {
        let rows = vec![raw(json!("100001"), json!("Smith Family"), "1001", "Sarah Jenkins", json!("#DIV/0!"))];

        let batch = normalize_batch(&rows, &SourceColumns::default());

        assert_eq!(batch.households.len(), 1);
        assert_eq!(batch.households[0].balance_current, None);
        assert_eq!(batch.report.count(IssueKind::UnparseableAmount), 1);
    }

    #[test]
    fn test_invalid_id_rejected() {
        let rows = vec![
            raw(json!("123"), json!("Short Id"), "1001", "Sarah Jenkins", json!("10")),
            raw(json!(123456), json!("Numeric Id"), "1001", "Sarah Jenkins", json!("10")),
        ];

        let batch = normalize_batch(&rows, &SourceColumns::default());

        assert_eq!(batch.households.len(), 1);
        assert_eq!(batch.households[0].id, "123456");
        assert_eq!(batch.report.count(IssueKind::InvalidRecord), 1);
    }
}

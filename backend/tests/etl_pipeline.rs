//! End-to-end pipeline runs against a temporary lakehouse.

use nexus::models::{FactSnapshot, HouseholdRecord, KpiObservation};
use nexus::store::{read_records, AGG_KPI_DAILY, FACT_HOUSEHOLD_MONTHLY, HOUSEHOLDS};
use nexus::{latest_bank_kpis, run, LakehouseStore, PipelineConfig, PipelineError, Stage, TableStore};
use rust_decimal::Decimal;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tempfile::tempdir;

const REPORT: &str = "\
Household ID,Household Name,Officer Code,Officer Name,Current Month-end Deposit Balance,Prior Month-end Deposit Balance,Prior Year-end Deposit Balance
100001,Smith Family,1001,Sarah Jenkins,\"$150,000.00\",\"$145,000.00\",\"$120,000.00\"
100002,Jones Family,Tom Reed,1002,\"$80,000.00\",\"$82,500.00\",(1000.00)
100003,,1001,Sarah Jenkins,$5.00,$5.00,$5.00
Totals,,,,\"$230,005.00\",,
";

fn config_for(root: &Path, body: &str) -> PipelineConfig {
    let source = root.join("household-balance-report.csv");
    fs::write(&source, body).unwrap();
    PipelineConfig::new(root.join("lakehouse"), source)
}

fn money(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn test_full_run_produces_kpis() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path(), REPORT);

    let report = run(Stage::All, &config).unwrap();

    assert_eq!(report.ingest.as_ref().unwrap().rows_ingested, 4);
    let transform = report.transform.as_ref().unwrap();
    assert_eq!(transform.households, 2);
    assert_eq!(transform.counterparties, 2);
    assert_eq!(report.aggregate.unwrap().kpis, 1);

    let store = LakehouseStore::open(&config.lakehouse_root).unwrap();

    let households: Vec<HouseholdRecord> = read_records(&store, &HOUSEHOLDS).unwrap();
    assert_eq!(households[1].counterparty_code.as_deref(), Some("1002"));
    assert_eq!(households[1].balance_ytd_start, Some(money("-1000.00")));

    let facts: Vec<FactSnapshot> = read_records(&store, &FACT_HOUSEHOLD_MONTHLY).unwrap();
    assert_eq!(facts[0].net_flow_mom, Some(money("5000")));
    assert_eq!(facts[0].net_flow_ytd, Some(money("30000")));
    assert_eq!(facts[1].net_flow_mom, Some(money("-2500")));

    let kpis: Vec<KpiObservation> = read_records(&store, &AGG_KPI_DAILY).unwrap();
    assert_eq!(kpis.len(), 1);
    assert_eq!(kpis[0].value.to_string(), "230000.00");

    let summary = latest_bank_kpis(&store).unwrap();
    assert_eq!(summary.total_deposits, money("230000.00"));
    assert_eq!(summary.report_date, Some(kpis[0].report_date));
}

#[test]
fn test_rerun_replaces_snapshot_and_appends_kpis() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path(), REPORT);
    run(Stage::All, &config).unwrap();

    fs::write(
        &config.source_path,
        "Household ID,Household Name,Officer Code,Officer Name,Current Month-end Deposit Balance\n\
         200001,Brown Family,1003,Ana Diaz,$10.00\n",
    )
    .unwrap();
    run(Stage::All, &config).unwrap();

    let store = LakehouseStore::open(&config.lakehouse_root).unwrap();
    let households: Vec<HouseholdRecord> = read_records(&store, &HOUSEHOLDS).unwrap();
    assert_eq!(households.len(), 1);
    assert_eq!(households[0].id, "200001");

    let kpis: Vec<KpiObservation> = read_records(&store, &AGG_KPI_DAILY).unwrap();
    assert_eq!(kpis.len(), 2);
    assert_eq!(latest_bank_kpis(&store).unwrap().total_deposits, money("10.00"));
}

#[test]
fn test_missing_source_exit_code() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig::new(dir.path().join("lakehouse"), dir.path().join("absent.csv"));

    let err = run(Stage::All, &config).unwrap_err();

    assert!(matches!(err, PipelineError::SourceNotFound(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_transform_without_ingest_is_missing_table() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path(), REPORT);

    let err = run(Stage::Transform, &config).unwrap_err();

    assert!(matches!(err, PipelineError::SourceTableMissing { .. }));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_header_only_source_writes_nothing() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path(), "Household ID,Household Name\n");

    let report = run(Stage::Ingest, &config).unwrap();

    assert_eq!(report.ingest.unwrap().rows_ingested, 0);
    let store = LakehouseStore::open(&config.lakehouse_root).unwrap();
    assert!(!store.exists(&nexus::store::RAW_HOUSEHOLD_BALANCES));
}

#[test]
fn test_semicolon_latin1_export() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("export.csv");
    let mut bytes = b"Household ID;Household Name;Officer Code;Officer Name;Current Month-End Deposit Balance\n".to_vec();
    bytes.extend_from_slice(b"100001;M\xe9nard Family;1001;Sarah Jenkins;$1,000.50\n");
    fs::write(&source, bytes).unwrap();
    let config = PipelineConfig::new(dir.path().join("lakehouse"), source);

    run(Stage::All, &config).unwrap();

    let store = LakehouseStore::open(&config.lakehouse_root).unwrap();
    let households: Vec<HouseholdRecord> = read_records(&store, &HOUSEHOLDS).unwrap();
    assert_eq!(households[0].balance_current, Some(money("1000.50")));
    assert!(households[0].name.starts_with('M'));
}

#[test]
fn test_xlsx_export_runs_end_to_end() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("household-balance-report.xlsx");

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    let headers = [
        "Household ID",
        "Household Name",
        "Officer Code",
        "Officer Name",
        "Current Month-end Deposit Balance",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    sheet.write_string(1, 0, "100001").unwrap();
    sheet.write_string(1, 1, "Smith Family").unwrap();
    sheet.write_string(1, 2, "1001").unwrap();
    sheet.write_string(1, 3, "Sarah Jenkins").unwrap();
    sheet.write_string(1, 4, "$1,000.50").unwrap();
    sheet.write_string(2, 0, "100002").unwrap();
    sheet.write_string(2, 1, "Jones Family").unwrap();
    sheet.write_number(2, 4, 250.0).unwrap();
    workbook.save(&source).unwrap();

    let config = PipelineConfig::new(dir.path().join("lakehouse"), source);
    let report = run(Stage::All, &config).unwrap();

    assert_eq!(report.transform.unwrap().households, 2);
    let store = LakehouseStore::open(&config.lakehouse_root).unwrap();
    assert_eq!(latest_bank_kpis(&store).unwrap().total_deposits, money("1250.50"));
}

#[test]
fn test_garbage_workbook_keeps_previous_snapshot() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path(), REPORT);
    run(Stage::All, &config).unwrap();

    let mut garbage = b"PK\x03\x04\x14\x00\x06\x00".to_vec();
    garbage.extend_from_slice(&[0xff; 128]);
    let bad_source = dir.path().join("household-balance-report.xlsx");
    fs::write(&bad_source, garbage).unwrap();
    let bad_config = PipelineConfig::new(config.lakehouse_root.clone(), bad_source);

    let err = run(Stage::All, &bad_config).unwrap_err();

    assert!(matches!(err, PipelineError::SourceReadError { .. }));
    assert_eq!(err.exit_code(), 3);
    let store = LakehouseStore::open(&config.lakehouse_root).unwrap();
    let households: Vec<HouseholdRecord> = read_records(&store, &HOUSEHOLDS).unwrap();
    assert_eq!(households.len(), 2);
    assert_eq!(latest_bank_kpis(&store).unwrap().total_deposits, money("230000.00"));
}

#[test]
fn test_unrelated_table_is_rejected() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path(), "Date,Ticker,Close\n2024-01-15,ACME,10.5\n");

    let err = run(Stage::Ingest, &config).unwrap_err();

    assert!(matches!(err, PipelineError::SourceReadError { .. }));
    let store = LakehouseStore::open(&config.lakehouse_root).unwrap();
    assert!(!store.exists(&nexus::store::RAW_HOUSEHOLD_BALANCES));
}

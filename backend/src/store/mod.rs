//! Lakehouse table store.
//!
//! Tables are addressed by a [`TableRef`] (zone + logical name). The
//! file-backed [`LakehouseStore`] keeps each table as JSON Lines at
//! `<root>/<zone>/<name>.jsonl`.
//!
//! Both write operations replace the table file in one rename, so a reader
//! sees either the old or the new contents:
//!
//! - [`TableStore::append_rows`] keeps existing rows and adds new ones
//! - [`TableStore::replace_all_rows`] discards existing rows
//!
//! Rows are schema-free maps, so a later write may add columns.

mod scan;

pub use scan::TableScan;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{StoreError, StoreResult};
use crate::models::Row;

/// Storage zone of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Immutable ingested batches
    Raw,
    /// Cleaned current-state tables
    Normalized,
    /// Facts and KPI rollups
    Derived,
}

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::Raw, Zone::Normalized, Zone::Derived];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Zone::Raw => "raw",
            Zone::Normalized => "normalized",
            Zone::Derived => "derived",
        }
    }
}

/// Logical address of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub zone: Zone,
    pub name: &'static str,
}

impl TableRef {
    pub const fn new(zone: Zone, name: &'static str) -> Self {
        Self { zone, name }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.zone.dir_name(), self.name)
    }
}

/// Raw spreadsheet rows, one batch per ingest run.
pub const RAW_HOUSEHOLD_BALANCES: TableRef = TableRef::new(Zone::Raw, "raw_household_balances");
/// Current household snapshot.
pub const HOUSEHOLDS: TableRef = TableRef::new(Zone::Normalized, "households");
/// Officers derived from the current batch.
pub const COUNTERPARTIES: TableRef = TableRef::new(Zone::Normalized, "counterparties");
/// Monthly household facts.
pub const FACT_HOUSEHOLD_MONTHLY: TableRef = TableRef::new(Zone::Derived, "fact_household_monthly");
/// KPI history.
pub const AGG_KPI_DAILY: TableRef = TableRef::new(Zone::Derived, "agg_kpi_daily");

/// Table storage used by the pipeline stages.
pub trait TableStore {
    /// Whether the table has ever been written.
    fn exists(&self, table: &TableRef) -> bool;

    /// Physical location of the table.
    fn location(&self, table: &TableRef) -> PathBuf;

    /// Add rows, keeping every existing row. Creates the table if needed.
    fn append_rows(&self, table: &TableRef, rows: &[Row]) -> StoreResult<usize>;

    /// Replace the whole table with `rows`.
    fn replace_all_rows(&self, table: &TableRef, rows: &[Row]) -> StoreResult<usize>;

    /// Lazily read the table in write order.
    fn scan(&self, table: &TableRef) -> StoreResult<TableScan>;
}

/// File-backed store rooted at a lakehouse directory.
#[derive(Debug, Clone)]
pub struct LakehouseStore {
    root: PathBuf,
}

impl LakehouseStore {
    /// Open a store, creating the zone directories.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        for zone in Zone::ALL {
            let dir = root.join(zone.dir_name());
            fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
                table: zone.dir_name().to_string(),
                source,
            })?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn zone_dir(&self, zone: Zone) -> PathBuf {
        self.root.join(zone.dir_name())
    }

    /// Write `existing` lines (if any) followed by `rows` to a temp file in
    /// the zone directory, then rename it over the table file.
    fn write_table(&self, table: &TableRef, keep_existing: bool, rows: &[Row]) -> StoreResult<()> {
        let io_err = |source| StoreError::Io {
            table: table.to_string(),
            source,
        };

        let dir = self.zone_dir(table.zone);
        fs::create_dir_all(&dir).map_err(io_err)?;

        let tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());

            let path = self.location(table);
            if keep_existing && path.exists() {
                let reader = BufReader::new(File::open(&path).map_err(io_err)?);
                for line in reader.lines() {
                    let line = line.map_err(io_err)?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    writeln!(writer, "{}", line).map_err(io_err)?;
                }
            }

            for row in rows {
                let line = serde_json::to_string(row).map_err(|source| StoreError::Record {
                    table: table.to_string(),
                    source,
                })?;
                writeln!(writer, "{}", line).map_err(io_err)?;
            }

            writer.flush().map_err(io_err)?;
        }
        tmp.as_file().sync_all().map_err(io_err)?;

        tmp.persist(self.location(table)).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl TableStore for LakehouseStore {
    fn exists(&self, table: &TableRef) -> bool {
        self.location(table).is_file()
    }

    fn location(&self, table: &TableRef) -> PathBuf {
        self.zone_dir(table.zone).join(format!("{}.jsonl", table.name))
    }

    fn append_rows(&self, table: &TableRef, rows: &[Row]) -> StoreResult<usize> {
        self.write_table(table, true, rows)?;
        Ok(rows.len())
    }

    fn replace_all_rows(&self, table: &TableRef, rows: &[Row]) -> StoreResult<usize> {
        self.write_table(table, false, rows)?;
        Ok(rows.len())
    }

    fn scan(&self, table: &TableRef) -> StoreResult<TableScan> {
        let path = self.location(table);
        if !path.is_file() {
            return Err(StoreError::TableMissing(table.to_string()));
        }
        let file = File::open(&path).map_err(|source| StoreError::Io {
            table: table.to_string(),
            source,
        })?;
        Ok(TableScan::from_reader(table.to_string(), BufReader::new(file)))
    }
}

// =============================================================================
// Typed helpers
// =============================================================================

/// Serialize typed records into rows.
pub fn to_rows<T: Serialize>(table: &TableRef, records: &[T]) -> StoreResult<Vec<Row>> {
    records
        .iter()
        .map(|record| {
            let value = serde_json::to_value(record).map_err(|source| StoreError::Record {
                table: table.to_string(),
                source,
            })?;
            match value {
                serde_json::Value::Object(map) => Ok(map),
                other => Err(StoreError::Corrupt {
                    table: table.to_string(),
                    line: 0,
                    message: format!("record serialized to non-object {}", other),
                }),
            }
        })
        .collect()
}

/// Append typed records to a table.
pub fn append_records<S, T>(store: &S, table: &TableRef, records: &[T]) -> StoreResult<usize>
where
    S: TableStore + ?Sized,
    T: Serialize,
{
    store.append_rows(table, &to_rows(table, records)?)
}

/// Replace a table with typed records.
pub fn replace_records<S, T>(store: &S, table: &TableRef, records: &[T]) -> StoreResult<usize>
where
    S: TableStore + ?Sized,
    T: Serialize,
{
    store.replace_all_rows(table, &to_rows(table, records)?)
}

/// Read a whole table as typed records.
pub fn read_records<S, T>(store: &S, table: &TableRef) -> StoreResult<Vec<T>>
where
    S: TableStore + ?Sized,
    T: DeserializeOwned,
{
    store.scan(table)?.decode::<T>().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    const T: TableRef = TableRef::new(Zone::Raw, "things");

    fn row(value: serde_json::Value) -> Row {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_open_creates_zones() {
        let dir = tempdir().unwrap();
        LakehouseStore::open(dir.path()).unwrap();

        for zone in Zone::ALL {
            assert!(dir.path().join(zone.dir_name()).is_dir());
        }
    }

    #[test]
    fn test_scan_missing_table() {
        let dir = tempdir().unwrap();
        let store = LakehouseStore::open(dir.path()).unwrap();

        assert!(!store.exists(&T));
        assert!(matches!(store.scan(&T), Err(StoreError::TableMissing(_))));
    }

    #[test]
    fn test_append_keeps_history_and_new_columns() {
        let dir = tempdir().unwrap();
        let store = LakehouseStore::open(dir.path()).unwrap();

        store.append_rows(&T, &[row(json!({ "a": 1 }))]).unwrap();
        store.append_rows(&T, &[row(json!({ "a": 2, "b": "new" }))]).unwrap();

        let rows = store.scan(&T).unwrap().collect_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["a"], 1);
        assert!(rows[0].get("b").is_none());
        assert_eq!(rows[1]["b"], "new");
    }

    #[test]
    fn test_replace_discards_previous_rows() {
        let dir = tempdir().unwrap();
        let store = LakehouseStore::open(dir.path()).unwrap();

        store.append_rows(&T, &[row(json!({ "a": 1 })), row(json!({ "a": 2 }))]).unwrap();
        store.replace_all_rows(&T, &[row(json!({ "z": true }))]).unwrap();

        let rows = store.scan(&T).unwrap().collect_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["z"], true);
    }

    #[test]
    fn test_replace_with_nothing_leaves_empty_table() {
        let dir = tempdir().unwrap();
        let store = LakehouseStore::open(dir.path()).unwrap();

        store.replace_all_rows(&T, &[]).unwrap();

        assert!(store.exists(&T));
        assert_eq!(store.scan(&T).unwrap().count(), 0);
    }

    #[test]
    fn test_typed_roundtrip() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Item {
            id: String,
            qty: u32,
        }

        let dir = tempdir().unwrap();
        let store = LakehouseStore::open(dir.path()).unwrap();
        let items = vec![Item { id: "x".into(), qty: 3 }];

        replace_records(&store, &T, &items).unwrap();
        let back: Vec<Item> = read_records(&store, &T).unwrap();

        assert_eq!(back, items);
    }

    #[test]
    fn test_location_layout() {
        let dir = tempdir().unwrap();
        let store = LakehouseStore::open(dir.path()).unwrap();

        assert_eq!(
            store.location(&HOUSEHOLDS),
            dir.path().join("normalized").join("households.jsonl")
        );
    }
}

//! Lazy table scans.
//!
//! A [`TableScan`] reads one JSON line at a time. `filter`, `select` and
//! `decode` wrap the underlying iterator, so nothing is parsed until the scan
//! is consumed.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::BufRead;

use crate::error::{StoreError, StoreResult};
use crate::models::Row;

/// Row iterator over one table.
pub struct TableScan {
    table: String,
    rows: Box<dyn Iterator<Item = StoreResult<Row>>>,
}

impl TableScan {
    /// Scan JSON Lines from a reader. Blank lines are skipped.
    pub fn from_reader<R: BufRead + 'static>(table: String, reader: R) -> Self {
        let name = table.clone();
        let rows = reader
            .lines()
            .enumerate()
            .filter_map(move |(idx, line)| {
                let line_no = idx + 1;
                match line {
                    Err(source) => Some(Err(StoreError::Io {
                        table: name.clone(),
                        source,
                    })),
                    Ok(text) if text.trim().is_empty() => None,
                    Ok(text) => Some(parse_line(&name, line_no, &text)),
                }
            });

        Self {
            table,
            rows: Box::new(rows),
        }
    }

    /// Keep rows matching `predicate`. Errors pass through.
    pub fn filter<F>(self, mut predicate: F) -> Self
    where
        F: FnMut(&Row) -> bool + 'static,
    {
        let rows = self.rows.filter(move |row| match row {
            Ok(row) => predicate(row),
            Err(_) => true,
        });
        Self {
            table: self.table,
            rows: Box::new(rows),
        }
    }

    /// Keep rows whose `column` equals `value`.
    pub fn filter_eq(self, column: &str, value: Value) -> Self {
        let column = column.to_string();
        self.filter(move |row| row.get(&column) == Some(&value))
    }

    /// Project every row onto `columns`. Missing columns come back as `null`.
    pub fn select(self, columns: &[&str]) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = self.rows.map(move |row| {
            row.map(|mut row| {
                columns
                    .iter()
                    .map(|c| (c.clone(), row.remove(c).unwrap_or(Value::Null)))
                    .collect::<Row>()
            })
        });
        Self {
            table: self.table,
            rows: Box::new(rows),
        }
    }

    /// Decode each row into a typed record.
    pub fn decode<T: DeserializeOwned>(self) -> impl Iterator<Item = StoreResult<T>> {
        let table = self.table;
        self.rows.map(move |row| {
            let row = row?;
            serde_json::from_value(Value::Object(row)).map_err(|source| StoreError::Record {
                table: table.clone(),
                source,
            })
        })
    }

    /// Materialize every row.
    pub fn collect_rows(self) -> StoreResult<Vec<Row>> {
        self.rows.collect()
    }
}

impl Iterator for TableScan {
    type Item = StoreResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

fn parse_line(table: &str, line: usize, text: &str) -> StoreResult<Row> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Corrupt {
            table: table.to_string(),
            line,
            message: format!("expected a JSON object, found {}", other),
        }),
        Err(e) => Err(StoreError::Corrupt {
            table: table.to_string(),
            line,
            message: e.to_string(),
        }),
    }
}

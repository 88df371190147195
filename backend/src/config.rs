//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is built once at process start and passed to every
//! stage. Nothing in the stages reads environment variables directly.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};
use crate::models::Row;

/// Default lakehouse root (overridden by `LAKEHOUSE_ROOT`).
pub const DEFAULT_LAKEHOUSE_ROOT: &str = "./lakehouse";

/// Default spreadsheet extract location.
pub const DEFAULT_SOURCE_PATH: &str = "./data/household-balance-report.csv";

/// Everything a stage needs to know about its environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory holding the `raw`, `normalized` and `derived` zones
    pub lakehouse_root: PathBuf,
    /// Spreadsheet extract read by the ingest stage
    pub source_path: PathBuf,
    /// Header names used to find each logical column
    pub columns: SourceColumns,
}

impl PipelineConfig {
    /// Config with the default column aliases.
    pub fn new(lakehouse_root: impl Into<PathBuf>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            lakehouse_root: lakehouse_root.into(),
            source_path: source_path.into(),
            columns: SourceColumns::default(),
        }
    }

    /// Replace the column aliases with the ones in a JSON file.
    ///
    /// Fields missing from the file keep their defaults.
    pub fn with_columns_file(mut self, path: &Path) -> PipelineResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        self.columns = serde_json::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("invalid column file {}: {}", path.display(), e)))?;
        Ok(self)
    }
}

/// Header aliases for every source column the transform reads.
///
/// Each list is tried in order; see [`SourceColumns::lookup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceColumns {
    pub household_id: Vec<String>,
    pub household_name: Vec<String>,
    pub officer_code: Vec<String>,
    pub officer_name: Vec<String>,
    pub balance_current: Vec<String>,
    pub balance_prior_month: Vec<String>,
    pub balance_ytd_start: Vec<String>,
}

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

impl Default for SourceColumns {
    fn default() -> Self {
        Self {
            household_id: aliases(&["Household ID"]),
            household_name: aliases(&["Household Name"]),
            officer_code: aliases(&["Officer Code"]),
            officer_name: aliases(&["Officer Name"]),
            balance_current: aliases(&[
                "Current Month-end Deposit Balance",
                "Current Month-End Deposit Balance",
                "Current Monthend Deposit Balance",
            ]),
            balance_prior_month: aliases(&[
                "Prior Month-end Deposit Balance",
                "Prior Month-End Deposit Balance",
                "Prior Monthend Deposit Balance",
            ]),
            balance_ytd_start: aliases(&[
                "Prior Year-end Deposit Balance",
                "Prior Year-End Deposit Balance",
                "Prior Yearend Deposit Balance",
            ]),
        }
    }
}

impl SourceColumns {
    /// Find a column value in a raw row.
    ///
    /// Exact header matches win; otherwise headers are compared trimmed and
    /// case-insensitively. Returns `None` when no alias matches.
    pub fn lookup<'a>(row: &'a Row, names: &[String]) -> Option<&'a serde_json::Value> {
        for name in names {
            if let Some(value) = row.get(name) {
                return Some(value);
            }
        }

        for name in names {
            if let Some((_, value)) = row.iter().find(|(k, _)| same_header(k, name)) {
                return Some(value);
            }
        }

        None
    }

    /// Logical columns a source must carry that none of `headers` matches.
    ///
    /// Only the household id and name are required; every other column may
    /// be absent and reads as `null`.
    pub fn missing_required(&self, headers: &[String]) -> Vec<&'static str> {
        let required = [
            ("household_id", &self.household_id),
            ("household_name", &self.household_name),
        ];

        required
            .into_iter()
            .filter(|(_, names)| !names.iter().any(|n| headers.iter().any(|h| same_header(h, n))))
            .map(|(column, _)| column)
            .collect()
    }
}

fn same_header(header: &str, alias: &str) -> bool {
    header == alias || header.trim().to_lowercase() == alias.trim().to_lowercase()
}

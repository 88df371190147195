//! Data-quality report for one transformed batch.
//!
//! The report is informational: nothing in it changes what gets written.

use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of problem found in a source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Footer row with a `Total`/`Totals` id; dropped.
    TotalsRow,
    /// Household name missing; row dropped.
    EmptyName,
    /// Officer code and name were swapped; corrected.
    SwappedFields,
    /// A balance cell had content but no number; kept as absent.
    UnparseableAmount,
    /// Candidate household failed validation; row dropped.
    InvalidRecord,
    /// Household id already seen in this batch; row dropped.
    DuplicateId,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TotalsRow => "totals_row",
            Self::EmptyName => "empty_name",
            Self::SwappedFields => "swapped_fields",
            Self::UnparseableAmount => "unparseable_amount",
            Self::InvalidRecord => "invalid_record",
            Self::DuplicateId => "duplicate_id",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem in one source row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualityIssue {
    /// 1-based position of the row within the batch
    pub row: usize,
    pub kind: IssueKind,
    pub household_id: Option<String>,
    pub column: Option<String>,
    pub detail: String,
}

/// Every issue found while normalizing one batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityReport {
    pub rows_scanned: usize,
    pub rows_accepted: usize,
    pub issues: Vec<DataQualityIssue>,
}

impl QualityReport {
    pub fn record(
        &mut self,
        row: usize,
        kind: IssueKind,
        household_id: Option<&str>,
        column: Option<&str>,
        detail: impl Into<String>,
    ) {
        self.issues.push(DataQualityIssue {
            row,
            kind,
            household_id: household_id.map(String::from),
            column: column.map(String::from),
            detail: detail.into(),
        });
    }

    /// Number of issues of one kind.
    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    /// Issue counts per kind, only for kinds that occurred.
    pub fn counts(&self) -> BTreeMap<IssueKind, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Log one summary line, plus a warning per issue kind.
    pub fn log_summary(&self, batch_id: &str) {
        info!(
            "quality_report batch_id={} rows_scanned={} rows_accepted={} issues={}",
            batch_id,
            self.rows_scanned,
            self.rows_accepted,
            self.issues.len()
        );

        for (kind, count) in self.counts() {
            let first = self.issues.iter().find(|i| i.kind == kind);
            warn!(
                "quality_issue batch_id={} kind={} count={} first_row={}",
                batch_id,
                kind,
                count,
                first.map(|i| i.row).unwrap_or_default()
            );
        }
    }
}

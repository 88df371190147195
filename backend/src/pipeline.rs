//! Stage runner.
//!
//! # Example
//!
//! ```rust,ignore
//! use nexus::config::PipelineConfig;
//! use nexus::pipeline::{run, Stage};
//!
//! let config = PipelineConfig::new("./lakehouse", "./data/report.csv");
//! let report = run(Stage::All, &config)?;
//! println!("{:?}", report.aggregate);
//! ```

use clap::ValueEnum;
use log::{error, info};
use serde::Serialize;

use crate::aggregate::{run_aggregate, AggregateSummary};
use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::ingest::{ingest, IngestSummary};
use crate::store::LakehouseStore;
use crate::transform::{run_transform, TransformSummary};

/// Which stages to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Stage {
    /// Ingest, then transform, then aggregate
    #[default]
    All,
    Ingest,
    Transform,
    Aggregate,
}

impl Stage {
    fn includes(&self, other: Stage) -> bool {
        *self == Stage::All || *self == other
    }
}

/// Per-stage results of one run. Stages that did not run are `None`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub ingest: Option<IngestSummary>,
    pub transform: Option<TransformSummary>,
    pub aggregate: Option<AggregateSummary>,
}

/// Run the selected stages in order, stopping at the first failure.
pub fn run(stage: Stage, config: &PipelineConfig) -> PipelineResult<RunReport> {
    info!(
        "pipeline_start stage={:?} lakehouse_root={} source={}",
        stage,
        config.lakehouse_root.display(),
        config.source_path.display()
    );

    let result = run_stages(stage, config);
    match &result {
        Ok(_) => info!("pipeline_complete stage={:?}", stage),
        Err(e) => error!("pipeline_failed stage={:?} exit_code={} error={}", stage, e.exit_code(), e),
    }
    result
}

fn run_stages(stage: Stage, config: &PipelineConfig) -> PipelineResult<RunReport> {
    let store = LakehouseStore::open(&config.lakehouse_root)?;
    let mut report = RunReport::default();

    if stage.includes(Stage::Ingest) {
        report.ingest = Some(ingest(config, &store)?);
    }
    if stage.includes(Stage::Transform) {
        report.transform = run_transform(config, &store)?;
    }
    if stage.includes(Stage::Aggregate) {
        report.aggregate = Some(run_aggregate(&store)?);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::store::{TableStore, HOUSEHOLDS, RAW_HOUSEHOLD_BALANCES};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_stage_selection() {
        assert!(Stage::All.includes(Stage::Transform));
        assert!(Stage::Ingest.includes(Stage::Ingest));
        assert!(!Stage::Ingest.includes(Stage::Aggregate));
    }

    #[test]
    fn test_single_stage_runs_alone() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("report.csv");
        fs::write(&source, "Household ID,Household Name\n100001,Smith Family\n").unwrap();
        let config = PipelineConfig::new(dir.path().join("lake"), source);

        let report = run(Stage::Ingest, &config).unwrap();

        assert_eq!(report.ingest.map(|i| i.rows_ingested), Some(1));
        assert!(report.transform.is_none());
        let store = LakehouseStore::open(&config.lakehouse_root).unwrap();
        assert!(store.exists(&RAW_HOUSEHOLD_BALANCES));
        assert!(!store.exists(&HOUSEHOLDS));
    }

    #[test]
    fn test_all_aborts_on_missing_source() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig::new(dir.path().join("lake"), dir.path().join("absent.csv"));

        let err = run(Stage::All, &config).unwrap_err();

        assert!(matches!(err, PipelineError::SourceNotFound(_)));
        let store = LakehouseStore::open(&config.lakehouse_root).unwrap();
        assert!(!store.exists(&HOUSEHOLDS));
    }
}

//! Nexus ETL CLI - household deposit balances to dashboard KPI tables
//!
//! # Commands
//!
//! ```bash
//! nexus-etl run                          # ingest → transform → aggregate
//! nexus-etl run --stage transform        # one stage only
//! nexus-etl run --source report.csv      # explicit spreadsheet extract
//! nexus-etl kpis                         # latest bank-wide KPIs as JSON
//! ```
//!
//! Exit codes: 0 success, 2 source not found, 3 source unreadable,
//! 4 required table missing, 5 storage failure, 1 anything else.

use clap::{Parser, Subcommand};
use log::error;
use nexus::config::{PipelineConfig, DEFAULT_LAKEHOUSE_ROOT, DEFAULT_SOURCE_PATH};
use nexus::error::PipelineError;
use nexus::logging::{self, LogFormat};
use nexus::pipeline::{self, Stage};
use nexus::query::latest_bank_kpis;
use nexus::store::LakehouseStore;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "nexus-etl")]
#[command(about = "Household deposit balance ETL", long_about = None)]
struct Cli {
    /// Lakehouse root directory
    #[arg(long, env = "LAKEHOUSE_ROOT", default_value = DEFAULT_LAKEHOUSE_ROOT, global = true)]
    lakehouse_root: PathBuf,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Default log level (RUST_LOG overrides)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run pipeline stages
    Run {
        /// Stage to run
        #[arg(long, value_enum, default_value_t = Stage::All)]
        stage: Stage,

        /// Spreadsheet extract to ingest
        #[arg(long, env = "SOURCE_PATH", default_value = DEFAULT_SOURCE_PATH)]
        source: PathBuf,

        /// JSON file overriding the source column aliases
        #[arg(long)]
        columns: Option<PathBuf>,
    },

    /// Print the latest bank-wide KPI values
    Kpis,
}

fn main() -> ExitCode {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.log_format, &cli.log_level);

    let result = match cli.command {
        Commands::Run { stage, source, columns } => cmd_run(stage, cli.lakehouse_root, source, columns),
        Commands::Kpis => cmd_kpis(cli.lakehouse_root),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("command_failed exit_code={} error={}", e.exit_code(), e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn cmd_run(
    stage: Stage,
    lakehouse_root: PathBuf,
    source: PathBuf,
    columns: Option<PathBuf>,
) -> Result<(), PipelineError> {
    let mut config = PipelineConfig::new(lakehouse_root, source);
    if let Some(path) = columns {
        config = config.with_columns_file(&path)?;
    }

    let report = pipeline::run(stage, &config)?;
    print_json(&report)
}

fn cmd_kpis(lakehouse_root: PathBuf) -> Result<(), PipelineError> {
    let store = LakehouseStore::open(&lakehouse_root)?;
    let summary = latest_bank_kpis(&store)?;
    print_json(&summary)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| PipelineError::Output(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

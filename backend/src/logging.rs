//! Process logging setup.
//!
//! Stages log through the `log` facade as `event_name key=value ...`
//! messages. The binary picks a text or JSON line format here; `RUST_LOG`
//! still overrides the level.

use chrono::{DateTime, SecondsFormat, Utc};
use clap::ValueEnum;
use env_logger::{Builder, Env, Target};
use log::Level;
use std::io::Write;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global logger. Later calls are ignored.
pub fn init(format: LogFormat, level: &str) {
    let mut builder = Builder::from_env(Env::default().default_filter_or(level));
    builder.target(Target::Stderr);

    if format == LogFormat::Json {
        builder.format(|buf, record| {
            let line = json_line(Utc::now(), record.level(), record.target(), &record.args().to_string());
            writeln!(buf, "{}", line)
        });
    }

    // tests and embedders may have installed a logger already
    let _ = builder.try_init();
}

/// Render one log record as a JSON object line.
pub fn json_line(timestamp: DateTime<Utc>, level: Level, target: &str, message: &str) -> String {
    serde_json::json!({
        "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        "level": level.as_str(),
        "target": target,
        "message": message,
    })
    .to_string()
}

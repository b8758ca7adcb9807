//! Tracing setup: human-readable lines on stderr plus a per-day audit file.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Audit log file name for the given day, e.g. `sms_2_way_2024_03_05.log`.
pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("sms_2_way_{}.log", now.format("%Y_%m_%d"))
}

/// Install the global subscriber. Returns the path of the audit file.
///
/// `RUST_LOG` wins over `level` when set. The terminal only shows warnings
/// so the prompt stays readable; the file gets everything.
pub fn init(dir: &Path, level: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    let path = dir.join(log_file_name(Local::now()));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sms_queue={level},smsq={level},warn")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(LevelFilter::WARN),
        )
        .with(
            fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .context("tracing subscriber already installed")?;

    Ok(path)
}

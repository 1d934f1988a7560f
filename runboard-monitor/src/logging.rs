//! File logging
//!
//! Stdout belongs to the terminal UI, so tracing output goes to a file.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

/// Environment variable holding an EnvFilter directive.
pub const LOG_ENV: &str = "RUNBOARD_LOG";

/// Build the filter: `RUNBOARD_LOG` wins, then the configured directive,
/// then `info`.
pub fn build_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber writing to `path`.
pub fn init(path: &Path, filter: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory: {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(build_filter(filter))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "runboard starting");
    Ok(())
}

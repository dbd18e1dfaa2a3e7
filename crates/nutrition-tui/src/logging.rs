//! File-based tracing setup.
//!
//! The terminal belongs to the UI, so log output goes to a file under the
//! user's local data directory. `RUST_LOG` overrides the default filter.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use nutrition_core::Config;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "nutrition_core=info,nutrition_tui=info";

/// Install the global subscriber. Returns the log file path.
pub fn init() -> Result<PathBuf> {
    let path = Config::log_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {e}"))?;

    Ok(path)
}

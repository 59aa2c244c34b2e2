//! Shared logging utilities for colguard binaries.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "colguard=info,colguard_schema=info,colguard_validator=info";
const QUIET_CONSOLE_FILTER: &str = "warn";

/// Logging configuration shared by colguard binaries.
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror the full filter on stderr instead of warnings only
    pub verbose: bool,
    /// Optional file that receives every event passing the filter
    pub log_file: Option<PathBuf>,
}

/// Initialize tracing with a stderr layer and an optional file layer.
///
/// `RUST_LOG` overrides the default filter for both layers.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let file_filter = base_filter();
    let console_filter = console_filter(config.verbose);

    let file_layer = match config.log_file.as_deref() {
        Some(path) => {
            let file = open_log_file(path)
                .with_context(|| format!("Failed to open log file for {}", config.app_name))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(file_filter),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(())
}

fn base_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Console filter: the full filter when verbose, warnings otherwise.
fn console_filter(verbose: bool) -> EnvFilter {
    if verbose {
        base_filter()
    } else {
        EnvFilter::new(QUIET_CONSOLE_FILTER)
    }
}

/// Open (creating parent directories) a log file in append mode.
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_log_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("colguard.log");
        let file = open_log_file(&path).unwrap();
        drop(file);
        assert!(path.exists());
    }

    #[test]
    fn test_console_filter_quiet_by_default() {
        assert_eq!(console_filter(false).to_string(), QUIET_CONSOLE_FILTER);
    }
}

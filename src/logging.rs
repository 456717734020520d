//! Log sink setup: plain-text file destination plus stderr.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn open_log_file(log_file: &Path) -> Result<File> {
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file {}", log_file.display()))
}

/// Install the global subscriber. `RUST_LOG` overrides the level.
///
/// An unusable log file degrades to stderr-only logging; the run goes on.
pub fn init(log_file: &Path, verbose: bool) -> Result<()> {
    let (file, open_error) = match open_log_file(log_file) {
        Ok(file) => (Some(file), None),
        Err(err) => (None, Some(err)),
    };

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file_layer = file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .context("Failed to install log subscriber")?;

    if let Some(err) = open_error {
        warn!(
            "Could not open log file {}, logging to stderr only: {:#}",
            log_file.display(),
            err
        );
    }

    Ok(())
}

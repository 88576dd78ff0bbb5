use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Where diagnostics go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sink {
    Stderr { ansi: bool },
    /// Appends to a file. Used by the dashboard, which owns the terminal.
    File(PathBuf),
}

pub fn dashboard_log_path(home_dir: &Path) -> PathBuf {
    crate::logs::logs_dir(home_dir).join("dashboard.log")
}

/// `RUST_LOG` if set, else `verbose` forces debug, else the configured level.
pub fn filter(level: &str, verbose: bool) -> EnvFilter {
    if let Ok(f) = EnvFilter::try_from_default_env() {
        return f;
    }
    let level = if verbose { "debug" } else { level };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global subscriber. A second call is a no-op.
pub fn init(filter: EnvFilter, sink: Sink) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match sink {
        Sink::Stderr { ansi } => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(ansi),
            )
            .try_init(),
        Sink::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create log directory: {}", parent.display())
                })?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file: {}", path.display()))?;
            registry
                .with(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_target(true)
                        .with_ansi(false),
                )
                .try_init()
        }
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

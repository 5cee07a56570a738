use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::DeployConfig;

fn default_filter(level: &str) -> String {
    format!("{level},dice_chain=debug,dice_app=debug")
}

/// Initializes the logging system with file + console output, in the
/// configured log directory. Returns a guard that must be kept alive for the
/// duration of the run.
pub fn init_logging(config: &DeployConfig) -> Result<WorkerGuard> {
    let logs_dir = config.log_directory()?;
    init_logging_to_dir(&logs_dir, &default_filter(&config.log_level))
}

/// Initialize logging into `logs_dir`, with `filter` used when `RUST_LOG` is
/// unset.
///
/// The console layer writes to stderr so stdout carries only the operator's
/// progress lines.
pub fn init_logging_to_dir(logs_dir: &Path, filter: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;

    // File appender: daily rotation
    let file_appender = tracing_appender::rolling::daily(logs_dir, "dice");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}

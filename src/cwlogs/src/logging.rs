use crate::constants::LOG_FILE_NAME;
use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, time::SystemTime},
    prelude::*,
    EnvFilter, Layer, Registry,
};

const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber: stderr always, a daily rolling file under
/// `log_dir` when given, and `extra` (typically a [`crate::ShipperLayer`]).
///
/// The filter comes from `RUST_LOG`, falling back to `info`.
pub fn setup_logging<L>(log_dir: Option<&Path>, extra: Option<L>) -> Result<()>
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(SystemTime)
        .with_writer(std::io::stderr);

    let file_layer = log_dir.map(|dir| {
        let file_appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_NAME);
        fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(true)
            .with_level(true)
            .with_timer(SystemTime)
            .with_ansi(false)
            .with_writer(file_appender)
    });

    let subscriber = tracing_subscriber::registry()
        .with(extra)
        .with(filter)
        .with(stderr_layer)
        .with(file_layer);

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match log_dir {
        Some(dir) => tracing::debug!(
            "Logging system initialized. Writing to {:?}",
            dir.join(LOG_FILE_NAME)
        ),
        None => tracing::debug!("Logging system initialized"),
    }

    Ok(())
}

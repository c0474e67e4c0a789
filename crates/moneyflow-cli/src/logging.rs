use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file prefix; files rotate daily as `moneyflow.log.YYYY-MM-DD`
const LOG_FILE: &str = "moneyflow.log";

/// Initialize the tracing subscriber for logging.
///
/// Use the RUST_LOG env var to control the level (e.g. `RUST_LOG=moneyflow_core=debug`).
/// Everything that passes the filter goes to stderr and to a daily log file
/// in `log_dir`.
pub fn init(log_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true),
        )
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).compact())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Log file prefix inside the log directory.
pub const LOG_PREFIX: &str = "es2scan";

/// Filter for the requested verbosity. `RUST_LOG` wins when set.
pub fn env_filter(debug_mode: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_mode {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Setup console logging with an optional daily rotating log file.
///
/// The console layer always runs and writes to stderr. With `log_dir`, a
/// plain-text file layer is added as well.
///
/// # Arguments
/// * `log_dir` - Directory for log files, created if missing
/// * `debug_mode` - If true, use debug level; otherwise use info level
///
/// # Returns
/// A guard that must be held for the duration of the program to keep file
/// logging active (`None` without a log directory)
pub fn setup_logging(log_dir: Option<&Utf8Path>, debug_mode: bool) -> Result<Option<WorkerGuard>> {
    let Some(log_dir) = log_dir else {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr) // stdout is reserved for --json
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(env_filter(debug_mode))
            .with(console_layer)
            .try_init()
            .context("Failed to install log subscriber")?;
        return Ok(None);
    };

    if !log_dir.exists() {
        fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }

    let file_appender = rolling::daily(log_dir, LOG_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false) // No ANSI codes in log files
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter(debug_mode))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}",
        log_dir,
        LOG_PREFIX,
        debug_mode
    );

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    #[test]
    #[allow(unused_variables)]
    fn test_setup_logging_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = Utf8PathBuf::try_from(temp_dir.path().join("logs")).unwrap();

        // Setup logging - this will fail if a subscriber is already installed
        // in this process, but the directory should still be created
        let result = setup_logging(Some(&log_dir), false);

        assert!(log_dir.exists());
    }

    #[test]
    fn test_setup_console_only() {
        // Either installs the subscriber or finds one from another test
        match setup_logging(None, true) {
            Ok(guard) => assert!(guard.is_none()),
            Err(e) => assert!(format!("{:#}", e).contains("Failed to install log subscriber")),
        }
    }
}

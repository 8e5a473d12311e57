//! Logging setup: journald on Linux, with a rolling log file as fallback.

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
///
/// On Linux this attempts to connect to systemd-journald. If that is
/// unavailable, or on other platforms, logs go to a daily file under
/// `log_dir` (default: the data directory's `fauxto/logs`).
///
/// The level is read from the `FAUXTO_LOG` environment variable using
/// `EnvFilter` syntax, e.g. `FAUXTO_LOG=debug` or `FAUXTO_LOG=fauxto::tagging=trace`.
/// Defaults to `info`.
pub fn init(log_dir: Option<PathBuf>) -> Result<()> {
    let env_filter = EnvFilter::try_from_env("FAUXTO_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(journald_layer.with_syslog_identifier("fauxto".to_string()))
                .init();

            tracing::info!("Logging initialized with journald backend");
            return Ok(());
        }
    }

    let log_dir = log_dir.unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fauxto")
            .join("logs")
    });

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "fauxto.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Flushes pending lines on exit; init() runs once at startup
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> = std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!(log_dir = %log_dir.display(), "Logging initialized with file backend");
    Ok(())
}

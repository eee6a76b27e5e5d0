use std::path::Path;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Keeps the file writer's background thread alive; dropping it flushes
/// any buffered log lines.
pub struct LoggingGuard {
    _guard: Option<WorkerGuard>,
}

/// Install the global subscriber. Logs go to stdout and, when `log_dir` is
/// given, to a daily-rotated file there. `RUST_LOG` overrides the default
/// `info` filter.
pub fn init_logging(log_dir: Option<&Path>) -> anyhow::Result<LoggingGuard> {
    // Bridge `log` records (used by the HTTP client module) into tracing.
    let _ = LogTracer::init();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "playlist-snapshot.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (Some(fmt::layer().with_ansi(false).with_writer(non_blocking)), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer);

    tracing_subscriber_global::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("failed to set global tracing subscriber: {}", e))?;

    Ok(LoggingGuard { _guard: guard })
}

use std::path::Path;

use color_eyre::{eyre::eyre, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "taskdeck=info";

/// Install a global subscriber writing to a daily log file under `data_dir/logs`.
///
/// The terminal belongs to the UI, so nothing is written to stdout/stderr.
/// `RUST_LOG` takes precedence over `level`. Keep the returned guard alive
/// for the life of the process or buffered lines are lost.
pub fn init(data_dir: &Path, level: Option<&str>) -> Result<WorkerGuard> {
  let log_dir = data_dir.join("logs");
  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&log_dir, "taskdeck.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let env_filter = EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_new(level.unwrap_or(DEFAULT_DIRECTIVE)))
    .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

  tracing_subscriber::registry()
    .with(env_filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false).with_target(true))
    .try_init()
    .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

  Ok(guard)
}

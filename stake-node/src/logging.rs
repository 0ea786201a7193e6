use anyhow::{anyhow, Context};
use std::fs::File;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Installs the global subscriber. `RUST_LOG` overrides `level` when set.
///
/// The returned guard flushes the file writer on drop and must live until shutdown.
pub fn init(level: &str, log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let builder = FmtSubscriber::builder().with_env_filter(filter).with_target(true);

    match log_file {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create log file {}", path.display()))?;
            let (non_blocking_writer, guard) = tracing_appender::non_blocking(file);
            builder
                .with_writer(non_blocking_writer)
                .with_ansi(false)
                .finish()
                .try_init()
                .map_err(|e| anyhow!("setting default subscriber failed: {}", e))?;
            Ok(Some(guard))
        }
        None => {
            builder.finish().try_init().map_err(|e| anyhow!("setting default subscriber failed: {}", e))?;
            Ok(None)
        }
    }
}

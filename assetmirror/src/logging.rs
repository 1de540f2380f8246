//! Logging setup.
//!
//! Logs go to stderr so they do not interfere with progress output on
//! stdout. An optional log file receives the same events without ANSI
//! colors through a non-blocking writer. `RUST_LOG` overrides the
//! verbosity-derived filter for both outputs.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Default filter directive for a `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)))
}

/// Install the global subscriber.
///
/// Returns the file writer's guard when `log_file` is set; it must be kept
/// alive until the process exits or buffered lines are lost.
pub fn init_logging(verbosity: u8, log_file: Option<&Path>) -> io::Result<Option<WorkerGuard>> {
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(filter(verbosity));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter(verbosity.max(1)));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(9), "trace");
    }

    #[test]
    fn test_log_file_receives_events() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logs/assetmirror.log");

        let guard = init_logging(1, Some(&path)).unwrap();
        assert!(guard.is_some());

        tracing::warn!("logging smoke test");
        drop(guard);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("logging smoke test"));
    }
}

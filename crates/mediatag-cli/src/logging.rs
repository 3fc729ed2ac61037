//! Logging setup

use std::path::Path;
use std::sync::OnceLock;

use tracing_subscriber::prelude::*;

static LOG_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the default level. When `log_dir` is set,
/// logs are also written to `mediatag.log` rotated daily inside it.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let file_layer = log_dir.and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Cannot create log directory {}: {}", dir.display(), e);
            return None;
        }
        let file_appender = tracing_appender::rolling::daily(dir, "mediatag.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
    });

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer);

    // Avoid panics if already initialized (tests).
    let _ = tracing::subscriber::set_global_default(subscriber);
}

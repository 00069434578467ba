//! # Logging Initialization
//!
//! The shim sits between the user and the wrapped tool, so its own output must
//! not mix with the tool's stdout and stderr. By default logs go to a daily
//! rolling file in the user's cache directory; stderr logging is opt-in (see
//! [`crate::config::ENV_LOG_TO_STDERR`]) and is also the fallback when no
//! writable cache directory exists.
//!
//! Verbosity follows `RUST_LOG` when set, otherwise the configured level.

use anyhow::Result;
use directories::ProjectDirs;
use std::{io::stderr, path::Path, sync::Once};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

static INIT: Once = Once::new();

/// Initialize verbose logging for tests.
pub fn init_test_logging() {
    init_logging("trace", false).expect("Failed to initialize test logging");
}

/// Initializes the global tracing subscriber once.
///
/// Later calls are no-ops, whatever their arguments.
pub fn init_logging(log_level: &str, log_to_file: bool) -> Result<()> {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

        if log_to_file && let Some(proj_dirs) = ProjectDirs::from("com", "NerdctlShim", "nerdctl_shim")
        {
            let log_dir = proj_dirs.cache_dir();

            // tracing_appender::rolling::daily panics on permission errors.
            let file_appender_result = if test_write_permission(log_dir) {
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    tracing_appender::rolling::daily(log_dir, "nerdctl_shim.log")
                }))
            } else {
                Err(Box::new("Cannot write to log directory") as Box<dyn std::any::Any + Send>)
            };

            if let Ok(file_appender) = file_appender_result {
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer().with_writer(non_blocking).with_ansi(false))
                    .init();
                // Leaked so buffered lines are flushed at exit.
                Box::leak(Box::new(guard));
                return;
            }
        }

        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer().with_writer(stderr).with_ansi(true))
            .init();
    });

    Ok(())
}

fn default_directives(log_level: &str) -> String {
    let level = match log_level.trim() {
        "" => "info",
        level => level,
    };
    format!("warn,nerdctl_shim={level},generate_command_tree={level}")
}

/// Checks that `dir` exists (creating it if needed) and accepts new files.
fn test_write_permission(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }

    let test_file = dir.join(".nerdctl_shim_log_test");
    match std::fs::write(&test_file, "test") {
        Ok(()) => {
            let _ = std::fs::remove_file(&test_file);
            true
        }
        Err(_) => false,
    }
}

use crate::error::DocsumError;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_NAME: &str = "docsum.log";

/// HTTP client and server internals are noisy at debug level
const QUIET_TARGETS: [&str; 3] = ["hyper", "reqwest", "h2"];

/// Console + file logging for the server
///
/// `RUST_LOG` overrides `log_level` when set. The file is appended to, never rotated.
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<(), DocsumError> {
    let (log_file, log_path) = open_log_file(log_dir)?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_filter(env_filter(log_level));

    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_filter(env_filter(log_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| DocsumError::config(format!("Failed to install subscriber: {}", e)))?;

    tracing::info!("Logging to {} at {}", log_path.display(), normalize_level(log_level));
    Ok(())
}

/// Console-only logging on stderr, so stdout stays free for CLI output
pub fn setup_console_logging(log_level: &str) -> Result<(), DocsumError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(env_filter(log_level))
        .try_init()
        .map_err(|e| DocsumError::config(format!("Failed to install subscriber: {}", e)))
}

fn open_log_file(log_dir: &Path) -> Result<(File, PathBuf), DocsumError> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        DocsumError::config(format!("Failed to create log directory {}: {}", log_dir.display(), e))
    })?;

    let path = log_dir.join(LOG_FILE_NAME);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| DocsumError::config(format!("Failed to open log file {}: {}", path.display(), e)))?;

    Ok((file, path))
}

fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)))
}

/// Build an `EnvFilter` directive for the configured level
pub fn filter_directive(log_level: &str) -> String {
    let level = normalize_level(log_level);
    let mut directive = level.to_string();
    if matches!(level, "trace" | "debug") {
        for target in QUIET_TARGETS {
            directive.push_str(&format!(",{}=info", target));
        }
    }
    directive
}

/// Map a configured level name onto a tracing level, `info` when unrecognized
pub fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    }
}

//! Structured logging infrastructure for Piispan.
//!
//! Wraps `tracing-subscriber` so the library and the server share one setup:
//! level and format come from [`LoggingConfig`], `RUST_LOG` overrides the
//! level, and output goes to stdout or a non-blocking file writer.


use crate::config::{LogFormat, LogLevel, LoggingConfig};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Crates whose debug output drowns out ours.
const QUIET_TARGETS: &[&str] = &["tokenizers=warn", "hyper=warn", "h2=warn"];

/// Error type for logging operations
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error in subscriber setup
    #[error("Subscriber error: {0}")]
    SubscriberError(Box<dyn std::error::Error + Send + Sync>),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for LogError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        LogError::SubscriberError(err)
    }
}

/// Result type for logging operations
pub type Result<T> = std::result::Result<T, LogError>;

/// Initialize the logging system with the given configuration.
///
/// Returns the file writer guard when logging to a file; keep it alive for
/// the lifetime of the process or buffered lines are lost. Calling this after
/// a global subscriber is installed is a no-op.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    if tracing::dispatcher::has_been_set() {
        return Ok(None);
    }

    let filter = build_filter(config.level);
    let (writer, guard) = make_writer(config)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true);

    match config.format {
        LogFormat::Json => builder
            .json()
            .with_line_number(true)
            .with_thread_ids(true)
            .try_init()?,
        LogFormat::Compact => builder.compact().try_init()?,
        LogFormat::Pretty => builder.pretty().with_line_number(true).try_init()?,
        LogFormat::Default => builder.try_init()?,
    }

    Ok(guard)
}

/// Build the event filter: `RUST_LOG` wins, otherwise the configured level.
fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut directives = vec![level.to_string()];
        directives.extend(QUIET_TARGETS.iter().map(|d| d.to_string()));
        EnvFilter::new(directives.join(","))
    })
}

/// Pick stdout or a non-blocking file writer.
fn make_writer(config: &LoggingConfig) -> Result<(BoxMakeWriter, Option<WorkerGuard>)> {
    match &config.file {
        Some(path) if !config.stdout => {
            let (writer, guard) = create_non_blocking_file(path)?;
            Ok((BoxMakeWriter::new(writer), Some(guard)))
        }
        Some(_) => {
            // Only one sink is installed; stdout takes precedence when both are asked for.
            Ok((BoxMakeWriter::new(std::io::stdout), None))
        }
        None => Ok((BoxMakeWriter::new(std::io::stdout), None)),
    }
}

/// Create a non-blocking file writer.
fn create_non_blocking_file(
    path: impl AsRef<Path>,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new(".")),
        path.file_name().unwrap_or_default(),
    );

    Ok(tracing_appender::non_blocking(file_appender))
}

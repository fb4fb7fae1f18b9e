//! Logging and tracing setup for the portal CLI
//!
//! Console output always goes to stderr so that command output on stdout
//! stays machine readable. An optional daily-rolling JSON file can be kept
//! alongside for bug reports.

use std::path::PathBuf;

use clap::ValueEnum;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Console log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Console output format
    pub format: LogFormat,

    /// Directory for the rolling JSON log file, if any
    pub log_dir: Option<PathBuf>,

    /// Whether to include file/line information in logs
    pub include_location: bool,

    /// Whether to log span open/close (probe and check timings)
    pub enable_spans: bool,

    /// Default log level filter, overridden by RUST_LOG
    pub default_filter: String,
}

impl LoggingConfig {
    /// Quiet console, library crates at info
    pub fn production() -> Self {
        Self {
            format: LogFormat::Pretty,
            log_dir: None,
            include_location: false,
            enable_spans: false,
            default_filter: "warn,portal_cli=info,portal_connection=info,portal_backend=info,portal_core=info".to_string(),
        }
    }

    /// Verbose console with locations and span timings
    pub fn development() -> Self {
        Self {
            format: LogFormat::Pretty,
            log_dir: None,
            include_location: true,
            enable_spans: true,
            default_filter: "info,portal_cli=debug,portal_connection=debug,portal_backend=debug,portal_core=debug".to_string(),
        }
    }

    #[cfg(test)]
    pub fn testing() -> Self {
        Self {
            format: LogFormat::Pretty,
            log_dir: None,
            include_location: true,
            enable_spans: true,
            default_filter: "debug".to_string(),
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_log_dir(mut self, log_dir: Option<PathBuf>) -> Self {
        self.log_dir = log_dir;
        self
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::development()
        } else {
            Self::production()
        }
    }
}

/// Default directory for log files
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("portal")
        .join("logs")
}

/// Initialize the global subscriber.
///
/// The returned guard flushes the file writer and must be held until exit.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    // RUST_LOG takes precedence over the configured filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();

    let console_layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .with_writer(std::io::stderr)
            .pretty()
            .with_filter(env_filter.clone())
            .boxed(),
        LogFormat::Json => fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_span_events(span_events.clone())
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .with_filter(env_filter.clone())
            .boxed(),
    };
    layers.push(console_layer);

    let mut guard = None;
    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;

        let file_appender = tracing_appender::rolling::daily(log_dir, "portal.log");
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();
        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = ?config.log_dir,
        format = ?config.format,
        "logging initialized"
    );

    Ok(guard)
}

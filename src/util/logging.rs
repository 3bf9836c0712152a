//! Structured logging setup for pyfront
//!
//! Initializes a `tracing` subscriber with an `EnvFilter` and either pretty
//! or JSON output. Logs always go to stderr so that synthesized scripts and
//! reports on stdout stay machine-readable.
//!
//! # Example
//!
//! ```no_run
//! use pyfront::util::logging;
//!
//! // Reads PYFRONT_LOG_LEVEL, PYFRONT_LOG_JSON and RUST_LOG
//! logging::init_from_env();
//!
//! tracing::info!("Frontend started");
//! ```

use crate::config::FrontendConfig;
use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Use JSON output format
    pub use_json: bool,

    /// Include the module target (e.g., pyfront::frontend) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,

    /// Include thread ID and name in logs
    pub include_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
            include_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// JSON output carries location and thread metadata as well
    pub fn from_config(config: &FrontendConfig) -> Self {
        Self {
            level: parse_level(&config.log_level),
            use_json: config.log_json,
            include_target: true,
            include_location: config.log_json,
            include_thread_ids: config.log_json,
        }
    }
}

/// Parses a log level, falling back to INFO for unknown values
///
/// ```
/// use pyfront::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("WARN"), Level::WARN);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Sets up the global subscriber; later calls are ignored
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = format!("pyfront={}", config.level).parse::<Directive>() {
            filter = filter.add_directive(directive);
        }

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_thread_ids(config.include_thread_ids)
                        .with_thread_names(config.include_thread_ids),
                )
                .init();
        }
    });
}

/// Initializes logging from `PYFRONT_LOG_LEVEL`, `PYFRONT_LOG_JSON` and `RUST_LOG`
pub fn init_from_env() {
    init_logging(LoggingConfig::from_config(&FrontendConfig::default()));
}

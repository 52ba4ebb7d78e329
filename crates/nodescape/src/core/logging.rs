//! Logging setup for the node map
//!
//! The library itself only emits `tracing` spans and events; binaries and
//! tests decide where they go by installing a subscriber through this module.
//!
//! # Usage
//!
//! ```rust,no_run
//! use nodescape::core::logging::init_logging;
//!
//! // Level and format from the environment, falling back to info/compact
//! init_logging(None, None).ok();
//! ```
//!
//! # Environment Variables
//!
//! - `NODESCAPE_LOG_LEVEL`: log level or full filter directive
//! - `RUST_LOG`: standard `tracing-subscriber` filter, used when the above is unset
//! - `NODESCAPE_LOG_FORMAT`: `compact`, `pretty` or `json`
//!
//! # Filtering
//!
//! Spans are named after the pipeline stage that opens them
//! (`apply_batch`, `layout_children`, `render_tile`, `execute_command`), so
//! per-module filters work as usual:
//!
//! ```bash
//! RUST_LOG="info,nodescape::layout=trace" nodescape render -i model.json
//! ```

use std::str::FromStr;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

const LEVEL_ENV: &str = "NODESCAPE_LOG_LEVEL";
const FORMAT_ENV: &str = "NODESCAPE_LOG_FORMAT";

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact single-line format
    #[default]
    Compact,
    /// Pretty multi-line format with colors
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl LogFormat {
    /// Get all valid format names
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

/// Resolved logging settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `warn,nodescape::render=debug`
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

impl LoggingConfig {
    /// Resolve settings from explicit values, then the environment, then defaults
    pub fn resolve(level: Option<&str>, format: Option<&str>) -> Result<Self, String> {
        let filter = level
            .map(str::to_string)
            .or_else(|| std::env::var(LEVEL_ENV).ok())
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| "info".to_string());

        let format = match format
            .map(str::to_string)
            .or_else(|| std::env::var(FORMAT_ENV).ok())
        {
            Some(name) => {
                LogFormat::from_str(&name).map_err(|e| format!("Invalid log format: {}", e))?
            }
            None => LogFormat::default(),
        };

        Ok(Self { filter, format })
    }

    fn env_filter(&self) -> EnvFilter {
        if self.filter == "off" {
            return EnvFilter::new("off");
        }
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Install the global subscriber
    ///
    /// Fails if a global subscriber is already set.
    pub fn install(&self) -> Result<(), Box<dyn std::error::Error>> {
        let filter = self.env_filter();
        match self.format {
            LogFormat::Compact => {
                Registry::default()
                    .with(filter)
                    .with(
                        fmt::Layer::default()
                            .with_target(false)
                            .with_level(true)
                            .with_span_events(FmtSpan::NONE),
                    )
                    .try_init()?;
            }
            LogFormat::Pretty => {
                Registry::default()
                    .with(filter)
                    .with(
                        fmt::Layer::default()
                            .with_target(true)
                            .with_file(true)
                            .with_line_number(true)
                            .with_span_events(FmtSpan::CLOSE)
                            .pretty(),
                    )
                    .try_init()?;
            }
            LogFormat::Json => {
                Registry::default()
                    .with(filter)
                    .with(
                        fmt::Layer::default()
                            .with_target(true)
                            .with_span_events(FmtSpan::CLOSE)
                            .json(),
                    )
                    .try_init()?;
            }
        }
        Ok(())
    }
}

/// Initialize the tracing subscriber with the given log level and format
///
/// `level` accepts a level name or a full filter directive; `format` is one of
/// [`LogFormat::variants`]. Missing values come from `NODESCAPE_LOG_LEVEL` /
/// `RUST_LOG` and `NODESCAPE_LOG_FORMAT`, then default to `info`/`compact`.
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    LoggingConfig::resolve(level, format)?.install()
}

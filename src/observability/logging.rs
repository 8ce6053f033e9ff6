//! Logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter directive when neither `RUST_LOG` nor config sets one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable lines.
    #[default]
    Pretty,
}

impl LogFormat {
    /// Parses a format name. Unknown names fall back to [`LogFormat::Pretty`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Line format.
    pub format: LogFormat,
    /// Level filter.
    pub filter: EnvFilter,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds the logging configuration.
    ///
    /// Precedence for the filter: `RUST_LOG`, then `--verbose` (debug for
    /// this crate), then the configured level, then [`DEFAULT_LOG_LEVEL`].
    /// `TENDERSCOPE_LOG_FORMAT` overrides the configured format.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        let format = std::env::var("TENDERSCOPE_LOG_FORMAT")
            .ok()
            .or_else(|| settings.format.clone())
            .map_or_else(LogFormat::default, |f| LogFormat::parse(&f));

        let directive = if verbose {
            "tenderscope=debug".to_string()
        } else {
            settings
                .level
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
        };
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&directive))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

        Self {
            format,
            filter,
            file: settings.file.clone(),
        }
    }
}

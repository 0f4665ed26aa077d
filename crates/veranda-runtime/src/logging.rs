//! Logging setup built on `tracing` and `tracing-subscriber`.
//!
//! ```rust,ignore
//! use veranda_runtime::logging;
//!
//! // From configuration:
//! logging::init_from_config(&config.logging);
//!
//! // Or manually:
//! logging::LoggingBuilder::new()
//!     .with_level(tracing::Level::DEBUG)
//!     .directive("veranda_core=trace")
//!     .init();
//! ```
//!
//! `RUST_LOG` always wins over the configured base level, so operators can
//! raise verbosity without touching config files.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{LogFormat, LoggingConfig};

/// Initializes logging from a [`LoggingConfig`].
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// A builder for the tracing subscriber.
#[derive(Default)]
pub struct LoggingBuilder {
    directives: Vec<String>,
    level: Option<tracing::Level>,
    format: LogFormat,
}

impl LoggingBuilder {
    /// Creates a builder with defaults (info level, compact format).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from a [`LoggingConfig`].
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut builder = Self::new();
        builder.level = Some(match config.level {
            crate::config::LogLevel::Trace => tracing::Level::TRACE,
            crate::config::LogLevel::Debug => tracing::Level::DEBUG,
            crate::config::LogLevel::Info => tracing::Level::INFO,
            crate::config::LogLevel::Warn => tracing::Level::WARN,
            crate::config::LogLevel::Error => tracing::Level::ERROR,
        });
        builder.format = config.format;
        for (module, level) in &config.filters {
            builder.directives.push(format!("{}={}", module, level.as_str()));
        }
        builder
    }

    /// Sets the base log level.
    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Adds a filter directive (`module=level`).
    pub fn directive(mut self, directive: &str) -> Self {
        self.directives.push(directive.to_string());
        self
    }

    /// Sets the output format.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    fn build_filter(&self) -> EnvFilter {
        let base = self
            .level
            .unwrap_or(tracing::Level::INFO)
            .to_string()
            .to_lowercase();

        // RUST_LOG takes precedence over the configured base level.
        let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base));
        for directive in &self.directives {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }
        filter
    }

    /// Initializes the global subscriber, panicking on double-init.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Initializes the global subscriber.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.build_filter();
        match self.format {
            LogFormat::Compact => tracing_subscriber::registry()
                .with(fmt::layer().compact())
                .with(filter)
                .try_init(),
            LogFormat::Full => tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(fmt::layer().pretty())
                .with(filter)
                .try_init(),
        }
    }
}

//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The underlying figment extraction failed.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// A bot's public key file could not be read.
    #[error("failed to read public key file '{path}': {reason}")]
    KeyFile {
        /// Configured path.
        path: String,
        /// I/O failure detail.
        reason: String,
    },

    /// A bot entry is incomplete or inconsistent.
    #[error("invalid bot configuration for '{bot_id}': {reason}")]
    InvalidBot {
        /// The offending bot.
        bot_id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Two bot entries collide.
    #[error("duplicate {field} '{value}' in bot configuration")]
    Duplicate {
        /// The colliding field (`bot_id` or `callback_path`).
        field: &'static str,
        /// The duplicated value.
        value: String,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

//! Configuration loading and schema.

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    ApiConfig, BotConfig, DispatchConfig, LogFormat, LogLevel, LoggingConfig, ServerConfig,
    VerandaConfig,
};

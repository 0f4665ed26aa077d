//! Runtime error types.

use thiserror::Error;

use veranda_core::RegistryError;

use crate::config::ConfigError;

/// Errors that can occur while assembling or running the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bot registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The webhook server could not bind or serve.
    #[error("webhook server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

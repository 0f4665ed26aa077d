//! # Veranda Runtime
//!
//! Orchestration layer of the Veranda bot framework: the bot registry, the
//! webhook dispatch engine, the axum callback server, configuration
//! loading and logging setup.
//!
//! The typical lifecycle:
//!
//! 1. [`VillaRuntime::new`] loads `veranda.toml` (+ `VERANDA_*` env
//!    overrides) and initializes logging;
//! 2. [`VillaRuntime::register_bot`] / `register_from_config` attach each
//!    hosted bot with its matchers;
//! 3. [`VillaRuntime::run`] serves webhook callbacks until shutdown.
//!
//! The engine itself is usable without the HTTP server: tests and custom
//! transports can feed [`DispatchEngine::handle_request`] directly.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod registry;
pub mod runtime;
pub mod server;

pub use config::{ConfigError, ConfigLoader, VerandaConfig};
pub use engine::{DispatchEngine, EngineOptions, WebhookOutcome};
pub use error::{RuntimeError, RuntimeResult};
pub use registry::{BotRegistry, RegisteredBot};
pub use runtime::{RuntimeBuilder, VillaRuntime};
pub use server::{DEFAULT_SIGN_HEADER, WebhookServer};

//! Runtime orchestration.
//!
//! [`VillaRuntime`] wires the pieces together: configuration, logging, the
//! shared API client, the registry, the dispatch engine and the webhook
//! server.
//!
//! ```rust,ignore
//! use veranda_runtime::VillaRuntime;
//! use veranda_core::{on_keyword, on_message};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = VillaRuntime::new();
//!     runtime.register_from_config("bot_abc", vec![
//!         on_message().handler(log_handler),
//!         on_keyword(["hello"]).handler(greet_handler),
//!     ])?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use veranda_api::{ApiClient, ApiClientConfig, VillaBot};
use veranda_core::{BotIdentity, Dispatcher, Matcher};

use crate::config::{ConfigError, ConfigLoader, VerandaConfig};
use crate::engine::{DispatchEngine, EngineOptions};
use crate::error::RuntimeResult;
use crate::logging;
use crate::registry::BotRegistry;
use crate::server::WebhookServer;

/// The assembled bot runtime.
pub struct VillaRuntime {
    config: VerandaConfig,
    registry: Arc<BotRegistry>,
    engine: Arc<DispatchEngine>,
    api_client: ApiClient,
}

impl VillaRuntime {
    /// Creates a runtime with automatic configuration loading.
    ///
    /// Searches for `veranda.toml` in the current directory and applies
    /// `VERANDA_*` environment overrides; falls back to defaults when no
    /// configuration is found.
    pub fn new() -> Self {
        let config = ConfigLoader::new().load().unwrap_or_else(|e| {
            eprintln!("warning: failed to load config ({e}), using defaults");
            VerandaConfig::default()
        });
        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from a loaded configuration.
    pub fn from_config(config: &VerandaConfig) -> Self {
        logging::init_from_config(&config.logging);

        let api_client = ApiClient::new(ApiClientConfig {
            base_url: config.api.base_url.clone(),
            timeout: config.api.timeout(),
        });
        let registry = Arc::new(BotRegistry::new());
        let engine = Arc::new(DispatchEngine::new(
            Arc::clone(&registry),
            EngineOptions::from(&config.dispatch),
        ));

        info!(
            bind = %config.server.bind_addr(),
            wait_until_complete = config.dispatch.wait_until_complete,
            "runtime initialized"
        );

        Self {
            config: config.clone(),
            registry,
            engine,
            api_client,
        }
    }

    /// The loaded configuration.
    pub fn config(&self) -> &VerandaConfig {
        &self.config
    }

    /// The bot registry.
    pub fn registry(&self) -> &Arc<BotRegistry> {
        &self.registry
    }

    /// The dispatch engine.
    pub fn engine(&self) -> &Arc<DispatchEngine> {
        &self.engine
    }

    /// Registers a bot with its matchers.
    ///
    /// Returns the bot's API handle, which can also be used outside of
    /// handlers (scheduled announcements and the like).
    pub fn register_bot(
        &self,
        identity: BotIdentity,
        matchers: Vec<Matcher>,
    ) -> RuntimeResult<Arc<VillaBot>> {
        let identity = Arc::new(identity);
        let bot = Arc::new(VillaBot::new(
            Arc::clone(&identity),
            self.api_client.clone(),
        ));

        let mut dispatcher =
            Dispatcher::new().with_handler_timeout(self.config.dispatch.handler_timeout());
        dispatcher.extend(matchers);

        self.registry
            .register(identity, dispatcher, bot.clone())?;
        Ok(bot)
    }

    /// Registers a bot declared in the configuration file.
    pub fn register_from_config(
        &self,
        bot_id: &str,
        matchers: Vec<Matcher>,
    ) -> RuntimeResult<Arc<VillaBot>> {
        let entry = self
            .config
            .bots
            .iter()
            .find(|b| b.bot_id == bot_id)
            .ok_or_else(|| ConfigError::InvalidBot {
                bot_id: bot_id.to_string(),
                reason: "not present in configuration".to_string(),
            })?;
        self.register_bot(entry.to_identity()?, matchers)
    }

    /// Serves webhooks until a shutdown signal arrives.
    pub async fn run(&self) -> RuntimeResult<()> {
        if self.registry.count() == 0 {
            warn!("starting with no registered bots; every callback will be rejected");
        }
        info!(bots = self.registry.count(), "starting Veranda runtime");

        let server = WebhookServer::new(Arc::clone(&self.engine), self.config.server.bind_addr())
            .with_sign_header(&self.config.server.sign_header);
        server.serve().await?;

        info!("runtime stopped");
        Ok(())
    }
}

impl Default for VillaRuntime {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`VillaRuntime`] with custom configuration sources.
pub struct RuntimeBuilder {
    loader: ConfigLoader,
}

impl RuntimeBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            loader: ConfigLoader::new(),
        }
    }

    /// Loads a specific configuration file.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.loader = self.loader.file(path);
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.loader = self.loader.profile(profile);
        self
    }

    /// Merges programmatic overrides.
    pub fn merge(mut self, config: VerandaConfig) -> Self {
        self.loader = self.loader.merge(config);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> RuntimeResult<VillaRuntime> {
        let config = self.loader.load()?;
        Ok(VillaRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

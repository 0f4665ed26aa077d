//! Registry of the bots this process hosts.
//!
//! Registration normally happens once at startup, before the webhook
//! server starts serving; after that the registry is read-only and lookups
//! run lock-contention-free on every inbound request. Dynamic
//! (un)registration is supported through the same write lock, so in-flight
//! lookups always see a consistent snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use veranda_core::{
    BotIdentity, BoxedBot, Dispatcher, RegistryError, SignatureVerifier,
};

/// Everything the engine needs for one hosted bot.
pub struct RegisteredBot {
    /// The bot's credentials.
    pub identity: Arc<BotIdentity>,
    /// Signature verifier built from the credentials.
    pub verifier: SignatureVerifier,
    /// The bot's matcher list.
    pub dispatcher: Arc<Dispatcher>,
    /// The API handle handed to handlers.
    pub bot: BoxedBot,
}

/// Maps bot IDs to their registered state.
#[derive(Default)]
pub struct BotRegistry {
    bots: RwLock<HashMap<String, Arc<RegisteredBot>>>,
}

impl BotRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a bot.
    ///
    /// Fails when the ID or callback path is already taken, or when the
    /// bot's public key does not parse. All three are startup-time
    /// configuration mistakes; nothing here is recoverable while serving.
    pub fn register(
        &self,
        identity: Arc<BotIdentity>,
        dispatcher: Dispatcher,
        bot: BoxedBot,
    ) -> Result<Arc<RegisteredBot>, RegistryError> {
        let verifier =
            SignatureVerifier::new(&identity).map_err(|e| RegistryError::InvalidPublicKey {
                bot_id: identity.bot_id.clone(),
                reason: e.to_string(),
            })?;

        let mut bots = self.bots.write();
        if bots.contains_key(&identity.bot_id) {
            return Err(RegistryError::DuplicateBotId(identity.bot_id.clone()));
        }
        if bots
            .values()
            .any(|b| b.identity.callback_path == identity.callback_path)
        {
            return Err(RegistryError::DuplicateCallbackPath(
                identity.callback_path.clone(),
            ));
        }

        info!(
            bot_id = %identity.bot_id,
            callback_path = %identity.callback_path,
            matchers = dispatcher.matcher_count(),
            verify_event = identity.verify_event,
            "registered bot"
        );

        let registered = Arc::new(RegisteredBot {
            verifier,
            dispatcher: Arc::new(dispatcher),
            bot,
            identity: Arc::clone(&identity),
        });
        bots.insert(identity.bot_id.clone(), Arc::clone(&registered));
        Ok(registered)
    }

    /// Looks up a bot by ID. Called on every inbound request; safe to call
    /// concurrently from any number of in-flight dispatches.
    pub fn lookup(&self, bot_id: &str) -> Option<Arc<RegisteredBot>> {
        self.bots.read().get(bot_id).cloned()
    }

    /// Removes a bot. In-flight dispatches holding the old `Arc` finish
    /// undisturbed.
    pub fn unregister(&self, bot_id: &str) -> Option<Arc<RegisteredBot>> {
        let removed = self.bots.write().remove(bot_id);
        if removed.is_some() {
            debug!(bot_id = %bot_id, "unregistered bot");
        }
        removed
    }

    /// The (bot ID, callback path) pairs to route.
    pub fn routes(&self) -> Vec<(String, String)> {
        self.bots
            .read()
            .values()
            .map(|b| (b.identity.bot_id.clone(), b.identity.callback_path.clone()))
            .collect()
    }

    /// Registered bot IDs.
    pub fn ids(&self) -> Vec<String> {
        self.bots.read().keys().cloned().collect()
    }

    /// Number of registered bots.
    pub fn count(&self) -> usize {
        self.bots.read().len()
    }
}

impl std::fmt::Debug for BotRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotRegistry")
            .field("bots", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::any::Any;
    use veranda_core::{ApiError, ApiResult, Bot, Event, Message, MessageContentInfo};

    struct NullBot;

    #[async_trait]
    impl Bot for NullBot {
        fn id(&self) -> &str {
            "bot_null"
        }

        async fn send_message(
            &self,
            _villa_id: u64,
            _room_id: u64,
            _object_name: &str,
            _msg_content: &MessageContentInfo,
        ) -> ApiResult<String> {
            Err(ApiError::MissingSession)
        }

        async fn send(&self, _event: &Event, _message: Message) -> ApiResult<String> {
            Err(ApiError::MissingSession)
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn identity(id: &str, path: &str) -> Arc<BotIdentity> {
        Arc::new(BotIdentity::new(id, "secret", "junk key", path).without_verification())
    }

    fn register(registry: &BotRegistry, id: &str, path: &str) -> Result<(), RegistryError> {
        registry
            .register(identity(id, path), Dispatcher::new(), Arc::new(NullBot))
            .map(|_| ())
    }

    #[test]
    fn register_and_lookup() {
        let registry = BotRegistry::new();
        register(&registry, "bot_1", "/a").unwrap();

        assert_eq!(registry.count(), 1);
        let found = registry.lookup("bot_1").unwrap();
        assert_eq!(found.identity.callback_path, "/a");
        assert!(registry.lookup("bot_2").is_none());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let registry = BotRegistry::new();
        register(&registry, "bot_1", "/a").unwrap();
        assert!(matches!(
            register(&registry, "bot_1", "/b"),
            Err(RegistryError::DuplicateBotId(_))
        ));
    }

    #[test]
    fn duplicate_callback_path_is_rejected() {
        let registry = BotRegistry::new();
        register(&registry, "bot_1", "/a").unwrap();
        assert!(matches!(
            register(&registry, "bot_2", "/a"),
            Err(RegistryError::DuplicateCallbackPath(_))
        ));
    }

    #[test]
    fn invalid_key_is_rejected_when_verification_is_on() {
        let registry = BotRegistry::new();
        let identity = Arc::new(BotIdentity::new("bot_1", "secret", "junk key", "/a"));
        let result = registry.register(identity, Dispatcher::new(), Arc::new(NullBot));
        assert!(matches!(
            result,
            Err(RegistryError::InvalidPublicKey { .. })
        ));
    }

    #[test]
    fn unregister_frees_the_id() {
        let registry = BotRegistry::new();
        register(&registry, "bot_1", "/a").unwrap();
        assert!(registry.unregister("bot_1").is_some());
        assert!(registry.lookup("bot_1").is_none());
        register(&registry, "bot_1", "/a").unwrap();
    }
}

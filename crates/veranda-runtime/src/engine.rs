//! The webhook dispatch engine.
//!
//! [`DispatchEngine::handle_request`] drives one inbound callback through
//! the request pipeline:
//!
//! ```text
//! Received -> Verified -> Decoded -> Matched -> Dispatched -> Completed
//!      \           \
//!       `-----------`--> Rejected (generic 401, no handler runs)
//! ```
//!
//! Two properties the pipeline guarantees:
//!
//! - the reply never says *why* authentication failed -- an unknown bot ID
//!   and a bad signature produce the same generic rejection, so callers
//!   cannot enumerate registered bots;
//! - the reply is produced within a bounded time no matter what handlers
//!   do: by default handlers run on a detached task after the reply, and
//!   in `wait_until_complete` mode the wait is cut off at the configured
//!   dispatch timeout (handlers keep running, only the wait stops).

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{info, warn};

use veranda_core::{Context, decode_event};

use crate::config::DispatchConfig;
use crate::registry::BotRegistry;

/// How the engine answered a webhook request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Authenticated, decoded and handed to the dispatcher.
    Dispatched,
    /// Authenticated but undecodable; acknowledged so the platform does
    /// not retry a payload that can never parse.
    AcknowledgedOnly,
    /// Authentication failed; generic rejection.
    Rejected,
}

impl WebhookOutcome {
    /// The HTTP status to reply with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Dispatched | Self::AcknowledgedOnly => 200,
            Self::Rejected => 401,
        }
    }

    /// The JSON reply body, following the platform convention.
    pub fn reply_body(&self) -> Value {
        match self {
            Self::Dispatched | Self::AcknowledgedOnly => {
                json!({ "retcode": 0, "message": "success" })
            }
            Self::Rejected => json!({ "retcode": 401, "message": "invalid request" }),
        }
    }

    /// Whether the request was rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

/// Engine reply-timing options.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// When `true`, the reply waits for dispatch, bounded by
    /// `dispatch_timeout`.
    pub wait_until_complete: bool,
    /// Upper bound on the reply wait.
    pub dispatch_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            wait_until_complete: false,
            dispatch_timeout: Duration::from_secs(25),
        }
    }
}

impl From<&DispatchConfig> for EngineOptions {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            wait_until_complete: config.wait_until_complete,
            dispatch_timeout: config.dispatch_timeout(),
        }
    }
}

/// Orchestrates verification, decoding and dispatch for inbound webhooks.
pub struct DispatchEngine {
    registry: Arc<BotRegistry>,
    options: EngineOptions,
}

impl DispatchEngine {
    /// Creates an engine over a registry.
    pub fn new(registry: Arc<BotRegistry>, options: EngineOptions) -> Self {
        Self { registry, options }
    }

    /// The registry this engine serves.
    pub fn registry(&self) -> &Arc<BotRegistry> {
        &self.registry
    }

    /// Handles one inbound webhook request.
    ///
    /// `bot_id` comes from the callback route, `sign_header` from the
    /// `x-rpc-bot_sign` header, `body` is the raw request body.
    pub async fn handle_request(
        &self,
        bot_id: &str,
        sign_header: Option<&str>,
        body: &[u8],
    ) -> WebhookOutcome {
        // Unknown bot and bad signature produce identical replies on
        // purpose; only the logs know the difference.
        let Some(registered) = self.registry.lookup(bot_id) else {
            warn!(bot_id = %bot_id, "webhook for unregistered bot rejected");
            return WebhookOutcome::Rejected;
        };

        if let Err(e) = registered.verifier.verify(body, sign_header) {
            warn!(bot_id = %bot_id, error = %e, "webhook signature rejected");
            return WebhookOutcome::Rejected;
        }

        let event = match decode_event(body) {
            Ok(event) => event,
            Err(e) => {
                // Authenticated but garbled: not the platform's fault to
                // retry, so acknowledge without dispatching.
                warn!(bot_id = %bot_id, error = %e, "acknowledged undecodable payload");
                return WebhookOutcome::AcknowledgedOnly;
            }
        };

        info!(bot_id = %bot_id, event = event.name(), "received event");

        let ctx = Arc::new(Context::new(Arc::new(event), Arc::clone(&registered.bot)));
        let dispatcher = Arc::clone(&registered.dispatcher);

        if self.options.wait_until_complete {
            let wait = tokio::time::timeout(self.options.dispatch_timeout, dispatcher.dispatch(ctx));
            if wait.await.is_err() {
                // Spawned handler tasks keep running; only the reply stops
                // waiting on them.
                warn!(bot_id = %bot_id, "dispatch exceeded the reply window");
            }
        } else {
            tokio::spawn(async move {
                dispatcher.dispatch(ctx).await;
            });
        }

        WebhookOutcome::Dispatched
    }
}

impl std::fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

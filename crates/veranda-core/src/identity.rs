//! Bot identity and credentials.

use serde::{Deserialize, Serialize};

/// The credential set identifying one registered bot account.
///
/// Created once at startup (usually from configuration) and immutable
/// afterwards. The registry owns identities and shares them via `Arc`;
/// events reference their originating bot only by ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotIdentity {
    /// Platform-assigned bot ID (`bot_...`).
    pub bot_id: String,
    /// Bot secret, used for request signing and outbound API auth.
    pub secret: String,
    /// Platform-issued RSA public key in PEM form. Whitespace-mangled keys
    /// as pasted from the developer console are accepted.
    pub pub_key: String,
    /// Path the platform delivers webhook callbacks to (e.g. `/callback`).
    pub callback_path: String,
    /// Whether to verify callback signatures. Disable only for local
    /// development against replayed payloads.
    #[serde(default = "default_verify_event")]
    pub verify_event: bool,
}

fn default_verify_event() -> bool {
    true
}

impl BotIdentity {
    /// Creates an identity with signature verification enabled.
    pub fn new(
        bot_id: impl Into<String>,
        secret: impl Into<String>,
        pub_key: impl Into<String>,
        callback_path: impl Into<String>,
    ) -> Self {
        let callback_path = callback_path.into();
        Self {
            bot_id: bot_id.into(),
            secret: secret.into(),
            pub_key: pub_key.into(),
            callback_path: normalize_path(&callback_path),
            verify_event: true,
        }
    }

    /// Disables signature verification for this identity.
    pub fn without_verification(mut self) -> Self {
        self.verify_event = false;
        self
    }
}

/// Ensures the callback path starts with a slash and is never empty.
fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

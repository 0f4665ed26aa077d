//! Configuration schema definitions.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use veranda_core::BotIdentity;

use super::error::{ConfigError, ConfigResult};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VerandaConfig {
    /// Webhook server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Platform API client settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Dispatch behavior.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// The bots this process hosts.
    #[serde(default)]
    pub bots: Vec<BotConfig>,
}

impl VerandaConfig {
    /// Validates cross-entry constraints.
    ///
    /// Duplicate bot IDs or callback paths are configuration mistakes the
    /// registry would reject later anyway; catching them here names the
    /// offending entry while the operator is still looking at the file.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut ids = std::collections::HashSet::new();
        let mut paths = std::collections::HashSet::new();
        for bot in &self.bots {
            if bot.bot_id.is_empty() {
                return Err(ConfigError::InvalidBot {
                    bot_id: "<empty>".to_string(),
                    reason: "bot_id must not be empty".to_string(),
                });
            }
            if bot.secret.is_empty() {
                return Err(ConfigError::InvalidBot {
                    bot_id: bot.bot_id.clone(),
                    reason: "secret must not be empty".to_string(),
                });
            }
            if bot.pub_key.is_none() && bot.pub_key_file.is_none() {
                return Err(ConfigError::InvalidBot {
                    bot_id: bot.bot_id.clone(),
                    reason: "one of pub_key or pub_key_file is required".to_string(),
                });
            }
            if !ids.insert(bot.bot_id.clone()) {
                return Err(ConfigError::Duplicate {
                    field: "bot_id",
                    value: bot.bot_id.clone(),
                });
            }
            if !paths.insert(bot.callback_path.clone()) {
                return Err(ConfigError::Duplicate {
                    field: "callback_path",
                    value: bot.callback_path.clone(),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Server
// =============================================================================

/// Webhook server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Name of the header carrying the callback signature. The platform
    /// defines this; override it if the platform documentation changes.
    #[serde(default = "default_sign_header")]
    pub sign_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            sign_header: default_sign_header(),
        }
    }
}

fn default_sign_header() -> String {
    "x-rpc-bot_sign".to_string()
}

impl ServerConfig {
    /// The bind address as `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    13350
}

// =============================================================================
// API client
// =============================================================================

/// Platform API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API endpoint base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in milliseconds.
    #[serde(default = "default_api_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_api_timeout_ms(),
        }
    }
}

impl ApiConfig {
    /// The request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_base_url() -> String {
    "https://bbs-api.miyoushe.com/vila/api/bot/platform/".to_string()
}

fn default_api_timeout_ms() -> u64 {
    10_000
}

// =============================================================================
// Dispatch
// =============================================================================

/// Dispatch behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Per-handler execution timeout in milliseconds.
    #[serde(default = "default_handler_timeout_ms")]
    pub handler_timeout_ms: u64,

    /// When `true`, the webhook reply waits for handlers to finish
    /// (bounded by `dispatch_timeout_ms`); when `false`, the reply is
    /// sent immediately and handlers run on a background task.
    #[serde(default)]
    pub wait_until_complete: bool,

    /// Upper bound on how long a webhook reply may wait on handlers, in
    /// milliseconds. Only used with `wait_until_complete`.
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            handler_timeout_ms: default_handler_timeout_ms(),
            wait_until_complete: false,
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
        }
    }
}

impl DispatchConfig {
    /// Per-handler timeout as a [`Duration`].
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }

    /// Reply-wait bound as a [`Duration`].
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }
}

fn default_handler_timeout_ms() -> u64 {
    10_000
}

fn default_dispatch_timeout_ms() -> u64 {
    25_000
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace.
    Trace,
    /// Debug.
    Debug,
    /// Info (default).
    #[default]
    Info,
    /// Warn.
    Warn,
    /// Error.
    Error,
}

impl LogLevel {
    /// The level as a filter directive fragment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One line per event (default).
    #[default]
    Compact,
    /// Full fields.
    Full,
    /// Multi-line, human-oriented.
    Pretty,
}

/// Logging setup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Base level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Per-module level overrides (`module = "debug"`).
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}

// =============================================================================
// Bots
// =============================================================================

/// One hosted bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Platform-assigned bot ID.
    pub bot_id: String,

    /// Bot secret.
    pub secret: String,

    /// Public key PEM, inline.
    #[serde(default)]
    pub pub_key: Option<String>,

    /// Path to a file holding the public key PEM. Ignored when `pub_key`
    /// is set.
    #[serde(default)]
    pub pub_key_file: Option<String>,

    /// Webhook callback path for this bot.
    #[serde(default = "default_callback_path")]
    pub callback_path: String,

    /// Whether to verify callback signatures.
    #[serde(default = "default_verify_event")]
    pub verify_event: bool,
}

fn default_callback_path() -> String {
    "/".to_string()
}

fn default_verify_event() -> bool {
    true
}

impl BotConfig {
    /// Resolves this entry into a [`BotIdentity`], reading the key file
    /// when the key is not inline.
    pub fn to_identity(&self) -> ConfigResult<BotIdentity> {
        let pub_key = match (&self.pub_key, &self.pub_key_file) {
            (Some(key), _) => key.clone(),
            (None, Some(path)) => {
                std::fs::read_to_string(path).map_err(|e| ConfigError::KeyFile {
                    path: path.clone(),
                    reason: e.to_string(),
                })?
            }
            (None, None) => {
                return Err(ConfigError::InvalidBot {
                    bot_id: self.bot_id.clone(),
                    reason: "one of pub_key or pub_key_file is required".to_string(),
                });
            }
        };
        let identity = BotIdentity::new(
            &self.bot_id,
            &self.secret,
            pub_key,
            &self.callback_path,
        );
        Ok(if self.verify_event {
            identity
        } else {
            identity.without_verification()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(id: &str, path: &str) -> BotConfig {
        BotConfig {
            bot_id: id.to_string(),
            secret: "secret".to_string(),
            pub_key: Some("KEY".to_string()),
            pub_key_file: None,
            callback_path: path.to_string(),
            verify_event: true,
        }
    }

    #[test]
    fn defaults_are_sane() {
        let config = VerandaConfig::default();
        assert_eq!(config.server.bind_addr(), "127.0.0.1:13350");
        assert_eq!(config.dispatch.handler_timeout(), Duration::from_secs(10));
        assert!(!config.dispatch.wait_until_complete);
    }

    #[test]
    fn validate_accepts_distinct_bots() {
        let config = VerandaConfig {
            bots: vec![bot("bot_1", "/a"), bot("bot_2", "/b")],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let config = VerandaConfig {
            bots: vec![bot("bot_1", "/a"), bot("bot_1", "/b")],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Duplicate { field: "bot_id", .. })
        ));
    }

    #[test]
    fn validate_rejects_duplicate_paths() {
        let config = VerandaConfig {
            bots: vec![bot("bot_1", "/a"), bot("bot_2", "/a")],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Duplicate {
                field: "callback_path",
                ..
            })
        ));
    }

    #[test]
    fn validate_requires_key_material() {
        let mut entry = bot("bot_1", "/a");
        entry.pub_key = None;
        let config = VerandaConfig {
            bots: vec![entry],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBot { .. })
        ));
    }

    #[test]
    fn identity_honors_verify_flag() {
        let mut entry = bot("bot_1", "/a");
        entry.verify_event = false;
        let identity = entry.to_identity().unwrap();
        assert!(!identity.verify_event);
        assert_eq!(identity.callback_path, "/a");
    }
}

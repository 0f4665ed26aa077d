//! Low-level HTTP client for the platform API.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, Method};
use serde_json::Value;
use tracing::{debug, trace};

use veranda_core::{ApiError, ApiResult};

use crate::models::ApiResponse;

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://bbs-api.miyoushe.com/vila/api/bot/platform/";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// API endpoint base URL.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// The shared platform HTTP client.
///
/// Wraps one `reqwest` connection pool; clones share the pool, so a single
/// `ApiClient` serves every bot in the process and is safe for concurrent
/// use from any number of handlers.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client with the given settings.
    pub fn new(config: ApiClientConfig) -> Self {
        let http = ClientBuilder::new()
            .timeout(config.timeout)
            .build()
            .expect("failed to create HTTP client");
        let base_url = if config.base_url.ends_with('/') {
            config.base_url
        } else {
            format!("{}/", config.base_url)
        };
        Self { http, base_url }
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Calls one API endpoint on behalf of a bot.
    ///
    /// Auth travels in the `x-rpc-bot_*` headers; `villa_id` is part of the
    /// auth header set, not the body. Non-zero retcodes map to typed
    /// [`ApiError`]s.
    pub async fn call(
        &self,
        method: Method,
        api: &str,
        bot_id: &str,
        secret_encrypted: &str,
        villa_id: Option<u64>,
        body: Value,
    ) -> ApiResult<Value> {
        debug!(bot_id = %bot_id, api = %api, "calling platform API");
        trace!(body = %body, "API request body");

        let url = format!("{}{}", self.base_url, api);
        let villa_header = villa_id.map(|id| id.to_string()).unwrap_or_default();
        let response = self
            .http
            .request(method, &url)
            .header("x-rpc-bot_id", bot_id)
            .header("x-rpc-bot_secret", secret_encrypted)
            .header("x-rpc-bot_villa_id", villa_header)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ApiError::Timeout
                } else {
                    ApiError::Transport(e.to_string())
                }
            })?;

        // The platform reports failures through the envelope retcode, not
        // the HTTP status, so decode the body regardless of status.
        let envelope: ApiResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else {
                ApiError::Serialization(e.to_string())
            }
        })?;
        trace!(retcode = envelope.retcode, "API response");

        if envelope.retcode == 0 {
            Ok(envelope.data.unwrap_or(Value::Null))
        } else {
            Err(ApiError::from_retcode(envelope.retcode, envelope.message))
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_a_trailing_slash() {
        let client = ApiClient::new(ApiClientConfig {
            base_url: "https://example.com/api".to_string(),
            timeout: DEFAULT_TIMEOUT,
        });
        assert_eq!(client.base_url(), "https://example.com/api/");
    }

    #[test]
    fn default_config_points_at_the_platform() {
        let config = ApiClientConfig::default();
        assert!(config.base_url.starts_with("https://bbs-api.miyoushe.com"));
    }
}

//! Unified error types for the Veranda core engine.
//!
//! The taxonomy follows the failure boundaries of the webhook pipeline:
//! authentication ([`AuthError`]), payload decoding ([`DecodeError`]),
//! handler execution ([`HandlerError`]), bot registration ([`RegistryError`])
//! and outbound platform calls ([`ApiError`]).

use thiserror::Error;

// =============================================================================
// Authentication Errors
// =============================================================================

/// Errors raised while authenticating an inbound webhook request.
///
/// All variants are reported to the caller as the same generic rejection;
/// the detail only shows up in logs.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No registered bot matches the requested identity.
    #[error("no bot registered for this request")]
    UnknownBot,

    /// The payload signature does not verify against the bot's public key.
    #[error("signature verification failed")]
    InvalidSignature,

    /// The signature header is absent or cannot be decoded.
    #[error("signature header missing or undecodable")]
    MalformedHeader,

    /// The configured public key could not be parsed. Raised at registration
    /// time, never while serving.
    #[error("invalid public key: {0}")]
    InvalidKey(String),
}

// =============================================================================
// Decode Errors
// =============================================================================

/// Errors raised while decoding a webhook payload into a typed event.
///
/// A well-formed payload with an unrecognized event type is *not* an error;
/// it decodes to the `Unknown` event variant.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The payload cannot be parsed as a callback event at all.
    #[error("malformed event payload: {0}")]
    Malformed(String),
}

impl DecodeError {
    /// Creates a malformed-payload error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }
}

// =============================================================================
// Handler Errors
// =============================================================================

/// Errors produced by a single handler invocation.
///
/// Handler failures are isolated: they are logged with the owning matcher's
/// identity and never propagate to sibling handlers or to the webhook reply.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    /// The handler returned an error or panicked.
    #[error("handler failed: {0}")]
    Failed(String),

    /// The handler did not finish within the configured execution timeout.
    #[error("handler timed out")]
    Timeout,
}

impl HandlerError {
    /// Wraps an arbitrary error message.
    pub fn failed(reason: impl ToString) -> Self {
        Self::Failed(reason.to_string())
    }
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors raised while registering bots. Fatal at startup.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A bot with the same ID is already registered.
    #[error("bot with ID '{0}' is already registered")]
    DuplicateBotId(String),

    /// Two bots were configured with the same callback path.
    #[error("callback path '{0}' is already taken")]
    DuplicateCallbackPath(String),

    /// The bot's public key could not be parsed.
    #[error("bot '{bot_id}' has an invalid public key: {reason}")]
    InvalidPublicKey {
        /// The offending bot.
        bot_id: String,
        /// Parse failure detail.
        reason: String,
    },
}

// =============================================================================
// API Errors
// =============================================================================

/// Result type for platform API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by outbound platform API calls.
///
/// Platform-side failures are mapped from the `retcode` field of the
/// response envelope; everything else covers transport and decoding.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The HTTP request itself failed.
    #[error("API transport error: {0}")]
    Transport(String),

    /// The API call did not complete within the client timeout.
    #[error("API call timed out")]
    Timeout,

    /// retcode -502.
    #[error("unknown server error: {0}")]
    UnknownServerError(String),

    /// retcode -1.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// retcode 10318001.
    #[error("insufficient permission: {0}")]
    InsufficientPermission(String),

    /// retcode 10322002.
    #[error("bot not added to villa: {0}")]
    BotNotAdded(String),

    /// retcode 10322003.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// retcode 10322004.
    #[error("invalid member bot access token: {0}")]
    InvalidMemberBotAccessToken(String),

    /// retcode 10322005.
    #[error("invalid bot auth info: {0}")]
    InvalidBotAuthInfo(String),

    /// retcode 10322006.
    #[error("unsupported message type: {0}")]
    UnsupportedMsgType(String),

    /// Any other non-zero retcode.
    #[error("action failed ({retcode}): {message}")]
    ActionFailed {
        /// Platform return code.
        retcode: i64,
        /// Platform-provided message.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to decode API response: {0}")]
    Serialization(String),

    /// The event carries no villa/room to reply into.
    #[error("event carries no reply target")]
    MissingSession,

    /// Attempted to send a message with no sendable content.
    #[error("message content is empty")]
    EmptyMessage,
}

impl ApiError {
    /// Maps a non-zero platform `retcode` to a typed error.
    pub fn from_retcode(retcode: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        match retcode {
            -502 => Self::UnknownServerError(message),
            -1 => Self::InvalidRequest(message),
            10318001 => Self::InsufficientPermission(message),
            10322002 => Self::BotNotAdded(message),
            10322003 => Self::PermissionDenied(message),
            10322004 => Self::InvalidMemberBotAccessToken(message),
            10322005 => Self::InvalidBotAuthInfo(message),
            10322006 => Self::UnsupportedMsgType(message),
            _ => Self::ActionFailed { retcode, message },
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retcode_mapping_covers_known_codes() {
        assert!(matches!(
            ApiError::from_retcode(-502, "boom"),
            ApiError::UnknownServerError(_)
        ));
        assert!(matches!(
            ApiError::from_retcode(-1, "bad"),
            ApiError::InvalidRequest(_)
        ));
        assert!(matches!(
            ApiError::from_retcode(10318001, ""),
            ApiError::InsufficientPermission(_)
        ));
        assert!(matches!(
            ApiError::from_retcode(10322002, ""),
            ApiError::BotNotAdded(_)
        ));
        assert!(matches!(
            ApiError::from_retcode(10322006, ""),
            ApiError::UnsupportedMsgType(_)
        ));
    }

    #[test]
    fn unrecognized_retcode_falls_back_to_action_failed() {
        match ApiError::from_retcode(42, "mystery") {
            ApiError::ActionFailed { retcode, message } => {
                assert_eq!(retcode, 42);
                assert_eq!(message, "mystery");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

//! Error types for the KeyAuth client
//!
//! `KeyAuthError` is the single taxonomy surfaced to callers of the session and
//! license APIs. Semantic "license not valid" answers are not errors; they are
//! carried in [`crate::models::ValidationResult`].

use thiserror::Error;

/// Failure raised while talking to the KeyAuth service without getting a response
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The connection could not be established (DNS, refused, TLS).
    #[error("could not connect: {0}")]
    Connect(String),

    /// Any other failure before a response status was received.
    #[error("request failed: {0}")]
    Request(String),
}

/// Failure of a single hardware identity source
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The source does not exist on this platform or could not be read.
    #[error("{source_name} is unavailable: {reason}")]
    Unavailable {
        source_name: &'static str,
        reason: String,
    },

    /// The source returned an empty or placeholder value.
    #[error("{source_name} returned an unusable value: {value:?}")]
    Placeholder {
        source_name: &'static str,
        value: String,
    },
}

/// Errors returned by `AuthSession` and `LicenseController`
#[derive(Debug, Error)]
pub enum KeyAuthError {
    /// The service rejected the username/password pair.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// A license operation was attempted without an active session, or the
    /// service no longer accepts the session token.
    #[error("not authenticated")]
    NotAuthenticated,

    /// No hardware identity source produced a usable value.
    #[error("hardware identity unavailable: {0}")]
    IdentityUnavailable(String),

    /// The license key is unknown, inactive, or expired.
    #[error("license key rejected: {0}")]
    KeyInvalid(String),

    /// The license key is bound to another machine or another user.
    #[error("license key is already bound elsewhere: {0}")]
    KeyAlreadyBoundElsewhere(String),

    /// No response was received from the service.
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// The service answered with a 5xx status.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// A success status came back with a body that does not match the protocol.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Client settings are invalid (for example an unparsable base URL).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl KeyAuthError {
    /// Whether retrying the same call later may succeed without user action
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server { .. })
    }

    /// A short, actionable message suitable for showing to an end user
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials => {
                "Login failed. Please check your username and password.".to_string()
            }
            Self::NotAuthenticated => "You are not logged in. Please log in first.".to_string(),
            Self::IdentityUnavailable(reason) => format!(
                "This machine's hardware ID could not be read ({reason}). \
                 Check that the application may query system information."
            ),
            Self::KeyInvalid(detail) => {
                format!("License activation failed: {detail}. Please check your license key.")
            }
            Self::KeyAlreadyBoundElsewhere(detail) => format!(
                "This license key is already in use on another machine or account ({detail})."
            ),
            Self::Network(err) => {
                format!("Could not reach the license server ({err}). Check your connection.")
            }
            Self::Server { status, .. } => {
                format!("The license server failed (HTTP {status}). Please try again later.")
            }
            Self::MalformedResponse(_) => {
                "The license server sent an unexpected response. The client may need an update."
                    .to_string()
            }
            Self::Configuration(detail) => format!("Invalid client configuration: {detail}"),
        }
    }
}

/// Result type for KeyAuth client operations
pub type KeyAuthResult<T> = Result<T, KeyAuthError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transient_kinds() {
        assert!(KeyAuthError::Network(TransportError::Timeout(Duration::from_secs(1))).is_transient());
        assert!(KeyAuthError::Server {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_transient());
        assert!(!KeyAuthError::InvalidCredentials.is_transient());
        assert!(!KeyAuthError::KeyInvalid("License key not found".to_string()).is_transient());
        assert!(!KeyAuthError::MalformedResponse("missing field".to_string()).is_transient());
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let errors = [
            KeyAuthError::InvalidCredentials,
            KeyAuthError::NotAuthenticated,
            KeyAuthError::IdentityUnavailable("no source".to_string()),
            KeyAuthError::KeyInvalid("not found".to_string()),
            KeyAuthError::KeyAlreadyBoundElsewhere("other machine".to_string()),
            KeyAuthError::Network(TransportError::Connect("refused".to_string())),
            KeyAuthError::Server {
                status: 500,
                message: "boom".to_string(),
            },
            KeyAuthError::MalformedResponse("bad json".to_string()),
            KeyAuthError::Configuration("bad url".to_string()),
        ];

        let messages: std::collections::HashSet<String> =
            errors.iter().map(KeyAuthError::user_message).collect();
        assert_eq!(messages.len(), errors.len());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = KeyAuthError::KeyAlreadyBoundElsewhere(
            "License key is bound to a different hardware ID".to_string(),
        );
        assert!(err.to_string().contains("different hardware ID"));

        let err = KeyAuthError::Network(TransportError::Timeout(Duration::from_secs(3)));
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_identity_error_display() {
        let err = IdentityError::Placeholder {
            source_name: "system UUID",
            value: "00000000-0000-0000-0000-000000000000".to_string(),
        };
        assert!(err.to_string().contains("system UUID"));
        assert!(err.to_string().contains("unusable"));
    }
}

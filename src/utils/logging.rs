// Centralized logging utilities so call sites never format secrets themselves
use log::{debug, info, warn};

use crate::error::KeyAuthError;
use crate::hwid::HardwareId;

const VISIBLE_PREFIX: usize = 4;

/// Mask a secret for logs: keep the first four characters, hide the rest
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    if secret.chars().count() <= VISIBLE_PREFIX {
        return "****".to_string();
    }
    let prefix: String = secret.chars().take(VISIBLE_PREFIX).collect();
    format!("{prefix}****")
}

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log a login attempt; the username is masked and the password never logged
    pub fn log_login_attempt(username: &str) {
        info!("{}", Self::login_attempt_message(username));
    }

    /// Log a successful login
    pub fn log_login_success(username: &str, user_id: i64, token: &str) {
        info!(
            "✅ Logged in as {} (user_id={user_id}, token={})",
            mask_secret(username),
            mask_secret(token)
        );
    }

    /// Log a failed login
    pub fn log_login_failure(username: &str, error: &KeyAuthError) {
        warn!("{}", Self::login_failure_message(username, error));
    }

    /// Log a local logout
    pub fn log_logout(username: &str) {
        info!("👋 Session for {} discarded", mask_secret(username));
    }

    fn login_attempt_message(username: &str) -> String {
        format!("🔐 Logging in as {}", mask_secret(username))
    }

    fn login_failure_message(username: &str, error: &KeyAuthError) -> String {
        format!("❌ Login failed for {}: {error}", mask_secret(username))
    }

    /// Log the identity that will be sent with a license call
    pub fn log_hwid_resolved(hwid: &HardwareId) {
        debug!(
            "🖥️  Resolved hardware ID from {} ({})",
            hwid.source(),
            mask_secret(hwid.value())
        );
    }

    /// Log a hardware identity source that could not be used
    pub fn log_hwid_source_failed(source: &str, reason: &str) {
        warn!("⚠️  Hardware identity source {source} failed: {reason}");
    }

    /// Log a license operation being sent
    pub fn log_license_request(operation: &str, license_key: &str) {
        info!("🔄 Sending license {operation} for key {}", mask_secret(license_key));
    }

    /// Log the outcome of a license operation
    pub fn log_license_outcome(operation: &str, license_key: &str, outcome: &str) {
        info!(
            "🎯 License {operation} for key {}: {outcome}",
            mask_secret(license_key)
        );
    }

    /// Log a license operation that raised an error
    pub fn log_license_error(operation: &str, license_key: &str, error: &KeyAuthError) {
        warn!(
            "❌ License {operation} for key {} failed: {error}",
            mask_secret(license_key)
        );
    }

    /// Log a call rejected locally before any network traffic
    pub fn log_gated_call(operation: &str) {
        warn!("⛔ License {operation} refused: no active session");
    }

    /// Log a client state transition
    pub fn log_state_transition(from: &str, to: &str) {
        if from != to {
            debug!("State transition: {from} -> {to}");
        }
    }

    /// Log raw response bodies at debug level for protocol troubleshooting
    pub fn log_response_raw(path: &str, status: u16, body: &str) {
        debug!("Raw response from {path} (HTTP {status}): {body}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret_keeps_prefix() {
        assert_eq!(mask_secret("ABCD-EFGH-IJKL"), "ABCD****");
        assert_eq!(mask_secret("abc"), "****");
        assert_eq!(mask_secret(""), "****");
    }

    #[test]
    fn test_login_messages_mask_username() {
        let attempt = LoggingHelper::login_attempt_message("alice.smith");
        let failure =
            LoggingHelper::login_failure_message("alice.smith", &KeyAuthError::InvalidCredentials);

        assert!(!attempt.contains("alice.smith"));
        assert!(attempt.contains("alic****"));
        assert!(!failure.contains("alice.smith"));
        assert!(failure.contains("alic****"));
    }

    #[test]
    fn test_mask_secret_multibyte() {
        assert_eq!(mask_secret("ключ-лицензии"), "ключ****");
    }
}

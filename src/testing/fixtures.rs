//! Test fixtures providing canned client inputs and service responses
//!
//! Response bodies mirror what the KeyAuth service sends, so the same fixtures
//! serve the mock transport and wiremock servers alike.

use chrono::{Duration, Utc};
use serde_json::{json, Value};

use super::constants::{TEST_PASSWORD, TEST_USERNAME, TEST_USER_ID};
use super::mock::MockIdentitySource;
use crate::hwid::{HardwareIdentity, HwidSource};
use crate::models::Credentials;
use crate::settings::KeyAuthSettings;

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Credentials the fixtures' login body belongs to
    #[must_use]
    pub fn credentials() -> Credentials {
        Credentials::new(TEST_USERNAME, TEST_PASSWORD)
    }

    /// Successful `/auth/login` body carrying `token`
    #[must_use]
    pub fn login_body(token: &str) -> Value {
        json!({
            "access_token": token,
            "token_type": "bearer",
            "user_id": TEST_USER_ID,
            "username": TEST_USERNAME,
            "is_admin": false,
        })
    }

    /// Successful `/license/activate` body; `expires_in_days = None` means no expiry
    #[must_use]
    pub fn activation_body(license_type: &str, expires_in_days: Option<i64>) -> Value {
        json!({
            "message": "License key activated successfully",
            "type": license_type,
            "expires_at": Self::expiry(expires_in_days),
        })
    }

    /// `/license/validate` body with a 200 status
    #[must_use]
    pub fn validation_body(valid: bool, license_type: &str, expires_in_days: Option<i64>) -> Value {
        let message = if valid {
            "License key is valid"
        } else {
            "License key is not valid"
        };
        json!({
            "valid": valid,
            "message": message,
            "type": license_type,
            "expires_at": Self::expiry(expires_in_days),
        })
    }

    /// Error body in the service's `{"detail": ...}` shape
    #[must_use]
    pub fn detail_body(detail: &str) -> Value {
        json!({ "detail": detail })
    }

    /// Identity that always resolves to `value` from the primary source
    #[must_use]
    pub fn identity(value: &str) -> HardwareIdentity {
        HardwareIdentity::new(
            Box::new(MockIdentitySource::available(HwidSource::SystemUuid, value)),
            Box::new(MockIdentitySource::unavailable(HwidSource::ProcessorId)),
        )
    }

    /// Identity with no readable source
    #[must_use]
    pub fn unavailable_identity() -> HardwareIdentity {
        HardwareIdentity::new(
            Box::new(MockIdentitySource::unavailable(HwidSource::SystemUuid)),
            Box::new(MockIdentitySource::unavailable(HwidSource::ProcessorId)),
        )
    }

    /// Default settings pointed at `base_url` with short timeouts
    #[must_use]
    pub fn settings(base_url: &str) -> KeyAuthSettings {
        let mut settings = KeyAuthSettings::default();
        settings.api.base_url = base_url.to_string();
        settings.api.timeout_seconds = 2;
        settings.api.connect_timeout_seconds = 1;
        settings
    }

    fn expiry(days: Option<i64>) -> Value {
        days.map_or(Value::Null, |days| {
            Value::String(
                (Utc::now() + Duration::days(days))
                    .format("%Y-%m-%dT%H:%M:%S")
                    .to_string(),
            )
        })
    }
}

//! License controller
//!
//! Drives the login -> activate/validate lifecycle on top of an [`AuthSession`]
//! and a [`HardwareIdentity`]. Every license call is gated locally: without a
//! session it fails with `NotAuthenticated`, and without a hardware ID it fails
//! with `IdentityUnavailable`, in both cases before any network traffic.
//!
//! All mutating operations take `&mut self`, so one controller never has two
//! calls in flight. Share a controller across tasks behind a mutex.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

use super::responses::{interpret_activation, interpret_status, interpret_validation};
use super::state::{ActiveLicense, LicenseState};
use crate::error::{KeyAuthError, KeyAuthResult};
use crate::hwid::{HardwareId, HardwareIdentity};
use crate::models::{ActivationResult, Credentials, LicenseSummary, Session, ValidationResult};
use crate::session::AuthSession;
use crate::settings::KeyAuthSettings;
use crate::transport::{ApiRequest, ReqwestTransport, Transport};
use crate::utils::logging::LoggingHelper;

pub const ACTIVATE_PATH: &str = "/license/activate";
pub const VALIDATE_PATH: &str = "/license/validate";
pub const STATUS_PATH: &str = "/license/status";

#[derive(Debug)]
pub struct LicenseController {
    session: AuthSession,
    identity: HardwareIdentity,
    active: Option<ActiveLicense>,
}

impl LicenseController {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, identity: HardwareIdentity) -> Self {
        Self {
            session: AuthSession::new(transport),
            identity,
            active: None,
        }
    }

    /// Controller using the reqwest transport and the platform identity sources
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the API settings are invalid.
    pub fn from_settings(settings: &KeyAuthSettings) -> KeyAuthResult<Self> {
        let transport = ReqwestTransport::new(&settings.api)?;
        let identity =
            HardwareIdentity::system().with_process_cache(settings.identity.cache_for_process);
        Ok(Self::new(Arc::new(transport), identity))
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> LicenseState {
        if !self.session.is_authenticated() {
            return LicenseState::Unauthenticated;
        }
        self.active
            .clone()
            .map_or(LicenseState::Authenticated, LicenseState::LicenseActive)
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.session()
    }

    #[must_use]
    pub fn current_token(&self) -> Option<&str> {
        self.session.current_token()
    }

    #[must_use]
    pub fn auth_session(&self) -> &AuthSession {
        &self.session
    }

    pub fn auth_session_mut(&mut self) -> &mut AuthSession {
        &mut self.session
    }

    /// Resolve the hardware ID that would be sent with a license call
    ///
    /// # Errors
    ///
    /// Returns `IdentityUnavailable` when no source yields a usable value.
    pub fn hardware_id(&self) -> KeyAuthResult<HardwareId> {
        self.identity.resolve()
    }

    /// Log in; on success any license confirmed under a previous session is forgotten
    ///
    /// # Errors
    ///
    /// See [`AuthSession::login`]. A failed login leaves the state unchanged.
    pub async fn login(&mut self, credentials: Credentials) -> KeyAuthResult<Session> {
        let before = self.state();
        let session = self.session.login(credentials).await?;
        self.active = None;
        LoggingHelper::log_state_transition(before.name(), self.state().name());
        Ok(session)
    }

    /// Drop the session and any active license locally
    pub fn logout(&mut self) {
        let before = self.state();
        self.session.logout();
        self.active = None;
        LoggingHelper::log_state_transition(before.name(), self.state().name());
    }

    /// Bind `license_key` to this machine's hardware ID
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated` without a session (no network call) or when the
    ///   service rejects the token
    /// - `IdentityUnavailable` when the hardware ID cannot be resolved (no network call)
    /// - `KeyInvalid` / `KeyAlreadyBoundElsewhere` when the service refuses the key
    /// - `Network`, `Server`, `MalformedResponse` for transport and protocol failures
    pub async fn activate(&mut self, license_key: &str) -> KeyAuthResult<ActivationResult> {
        let operation = "activation";
        let hwid = self.prepare(operation)?;
        LoggingHelper::log_license_request(operation, license_key);

        let before = self.state();
        let request = ApiRequest::post(
            ACTIVATE_PATH,
            json!({ "license_key": license_key, "hwid": hwid.value() }),
        );
        let outcome = match self.session.send_authorized(request).await {
            Ok(response) => interpret_activation(&response),
            Err(err) => Err(err),
        };
        self.sync_after_session_loss();

        match outcome {
            Ok(result) => {
                self.active = Some(ActiveLicense {
                    license_key: license_key.to_string(),
                    license_type: Some(result.license_type.clone()),
                    expires_at: result.expires_at,
                    hwid,
                    confirmed_at: Utc::now(),
                });
                LoggingHelper::log_license_outcome(operation, license_key, "activated");
                LoggingHelper::log_state_transition(before.name(), self.state().name());
                Ok(result)
            }
            Err(err) => {
                LoggingHelper::log_license_error(operation, license_key, &err);
                LoggingHelper::log_state_transition(before.name(), self.state().name());
                Err(err)
            }
        }
    }

    /// Check that `license_key` is still valid for this machine
    ///
    /// Expired licenses, foreign hardware IDs and unknown keys come back as
    /// `Ok` with `valid == false`.
    ///
    /// # Errors
    ///
    /// - `NotAuthenticated` without a session (no network call) or when the
    ///   service rejects the token
    /// - `IdentityUnavailable` when the hardware ID cannot be resolved (no network call)
    /// - `Network`, `Server`, `MalformedResponse` for transport and protocol failures
    pub async fn validate(&mut self, license_key: &str) -> KeyAuthResult<ValidationResult> {
        let operation = "validation";
        let hwid = self.prepare(operation)?;
        LoggingHelper::log_license_request(operation, license_key);

        let before = self.state();
        let request = ApiRequest::post(
            VALIDATE_PATH,
            json!({ "license_key": license_key, "hwid": hwid.value() }),
        );
        let outcome = match self.session.send_authorized(request).await {
            Ok(response) => interpret_validation(&response, Utc::now()),
            Err(err) => Err(err),
        };
        self.sync_after_session_loss();

        match outcome {
            Ok(result) => {
                if result.valid {
                    self.active = Some(ActiveLicense {
                        license_key: license_key.to_string(),
                        license_type: result.license_type.clone(),
                        expires_at: result.expires_at,
                        hwid,
                        confirmed_at: Utc::now(),
                    });
                } else {
                    self.active = None;
                }
                LoggingHelper::log_license_outcome(operation, license_key, &result.describe());
                LoggingHelper::log_state_transition(before.name(), self.state().name());
                Ok(result)
            }
            Err(err) => {
                LoggingHelper::log_license_error(operation, license_key, &err);
                LoggingHelper::log_state_transition(before.name(), self.state().name());
                Err(err)
            }
        }
    }

    /// List the licenses held by the logged-in user
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a session or on a rejected token; otherwise
    /// `Network`, `Server`, `MalformedResponse`.
    pub async fn license_status(&mut self) -> KeyAuthResult<Vec<LicenseSummary>> {
        if !self.session.is_authenticated() {
            LoggingHelper::log_gated_call("status");
            return Err(KeyAuthError::NotAuthenticated);
        }
        let outcome = match self.session.send_authorized(ApiRequest::get(STATUS_PATH)).await {
            Ok(response) => interpret_status(&response),
            Err(err) => Err(err),
        };
        self.sync_after_session_loss();
        outcome
    }

    /// Local preconditions shared by activate and validate
    fn prepare(&self, operation: &str) -> KeyAuthResult<HardwareId> {
        if !self.session.is_authenticated() {
            LoggingHelper::log_gated_call(operation);
            return Err(KeyAuthError::NotAuthenticated);
        }
        self.identity.resolve()
    }

    /// A rejected token drops the session; the active license goes with it
    fn sync_after_session_loss(&mut self) {
        if !self.session.is_authenticated() {
            self.active = None;
        }
    }
}

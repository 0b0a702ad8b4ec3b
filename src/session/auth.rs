//! Bearer-token session lifecycle
//!
//! `AuthSession` exchanges credentials for a token once per `login` call and
//! attaches that token to every later authenticated request. There is exactly
//! one active session per instance; a failed login never installs a partial one.

use chrono::Utc;
use serde_json::json;
use std::fmt;
use std::sync::Arc;

use crate::error::{KeyAuthError, KeyAuthResult};
use crate::models::auth::LoginResponse;
use crate::models::{Credentials, Session, UserProfile};
use crate::transport::{ApiRequest, ApiResponse, Transport};
use crate::utils::logging::LoggingHelper;

pub const LOGIN_PATH: &str = "/auth/login";
pub const PROFILE_PATH: &str = "/auth/me";

pub struct AuthSession {
    transport: Arc<dyn Transport>,
    session: Option<Session>,
}

impl AuthSession {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            session: None,
        }
    }

    /// Exchange credentials for a session and make it the active one
    ///
    /// The credentials are consumed and dropped when the call returns. No retry
    /// is attempted.
    ///
    /// # Errors
    ///
    /// - `InvalidCredentials` on a 4xx answer
    /// - `Server` on a 5xx answer
    /// - `Network` when no response arrives
    /// - `MalformedResponse` when a 2xx body does not decode or carries no token
    pub async fn login(&mut self, credentials: Credentials) -> KeyAuthResult<Session> {
        LoggingHelper::log_login_attempt(&credentials.username);

        let request = ApiRequest::post(
            LOGIN_PATH,
            json!({
                "username": credentials.username,
                "password": credentials.password,
            }),
        );
        let result = match self.transport.send(request).await {
            Ok(response) => Self::session_from_response(&response),
            Err(err) => Err(KeyAuthError::Network(err)),
        };

        match result {
            Ok(session) => {
                LoggingHelper::log_login_success(&session.username, session.user_id, &session.token);
                self.session = Some(session.clone());
                Ok(session)
            }
            Err(err) => {
                LoggingHelper::log_login_failure(&credentials.username, &err);
                Err(err)
            }
        }
    }

    fn session_from_response(response: &ApiResponse) -> KeyAuthResult<Session> {
        if response.is_client_error() {
            return Err(KeyAuthError::InvalidCredentials);
        }
        if response.is_server_error() {
            return Err(response.server_error());
        }
        if !response.is_success() {
            return Err(response.unexpected_status());
        }

        let login: LoginResponse = response.json()?;
        if login.access_token.trim().is_empty() {
            return Err(KeyAuthError::MalformedResponse(
                "login response carried an empty access_token".to_string(),
            ));
        }
        if !login.token_type.eq_ignore_ascii_case("bearer") {
            return Err(KeyAuthError::MalformedResponse(format!(
                "unsupported token_type {:?}",
                login.token_type
            )));
        }

        Ok(Session {
            token: login.access_token,
            token_type: login.token_type,
            issued_at: Utc::now(),
            user_id: login.user_id,
            username: login.username,
            is_admin: login.is_admin,
        })
    }

    /// Token of the active session, if any
    #[must_use]
    pub fn current_token(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.token.as_str())
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Drop the active session locally; the service is not contacted
    pub fn logout(&mut self) -> Option<Session> {
        let session = self.session.take();
        if let Some(ref ended) = session {
            LoggingHelper::log_logout(&ended.username);
        }
        session
    }

    /// Fetch the logged-in user's profile from `/auth/me`
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` without a network call when no session is
    /// active, or when the service rejects the token. Otherwise the usual
    /// `Server`/`Network`/`MalformedResponse` mapping applies.
    pub async fn fetch_profile(&mut self) -> KeyAuthResult<UserProfile> {
        let response = self.send_authorized(ApiRequest::get(PROFILE_PATH)).await?;
        if response.is_success() {
            return response.json();
        }
        if response.is_server_error() {
            return Err(response.server_error());
        }
        if response.is_client_error() {
            return Err(KeyAuthError::MalformedResponse(format!(
                "profile request rejected with HTTP {}: {}",
                response.status,
                response.detail().unwrap_or_default()
            )));
        }
        Err(response.unexpected_status())
    }

    /// Send a request carrying the active token
    ///
    /// The token is snapshotted for this call. A 401 answer means the service no
    /// longer accepts the token: the session is dropped and `NotAuthenticated`
    /// returned. This runs before any endpoint-specific mapping, so a 401 from
    /// `/license/validate` is an expired session rather than a `valid = false`
    /// answer, and the client moves back to `Unauthenticated`. Every other
    /// status is handed back for the caller to interpret.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthenticated` (no network call) without an active session,
    /// `NotAuthenticated` on 401, and `Network` when no response arrives.
    pub(crate) async fn send_authorized(
        &mut self,
        request: ApiRequest,
    ) -> KeyAuthResult<ApiResponse> {
        let token = self
            .current_token()
            .map(str::to_string)
            .ok_or(KeyAuthError::NotAuthenticated)?;

        let path = request.path;
        let response = self.transport.send(request.with_bearer(token)).await?;
        LoggingHelper::log_response_raw(path, response.status, &response.body);

        if response.status == 401 {
            self.logout();
            return Err(KeyAuthError::NotAuthenticated);
        }
        Ok(response)
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::testing::fixtures::TestFixtures;
    use crate::testing::mock::MockTransport;
    use crate::transport::HttpMethod;
    use std::time::Duration;

    fn session_with(transport: &Arc<MockTransport>) -> AuthSession {
        AuthSession::new(transport.clone())
    }

    #[tokio::test]
    async fn test_login_installs_session() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, TestFixtures::login_body("token-abc"));
        let mut auth = session_with(&transport);

        let session = auth.login(TestFixtures::credentials()).await.unwrap();

        assert_eq!(session.token, "token-abc");
        assert_eq!(auth.current_token(), Some("token-abc"));
        assert!(auth.is_authenticated());

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].path, LOGIN_PATH);
        assert!(requests[0].bearer.is_none());
        assert_eq!(
            requests[0].body,
            Some(json!({"username": "alice", "password": "correct horse"}))
        );
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(401, json!({"detail": "Invalid username or password"}));
        let mut auth = session_with(&transport);

        let err = auth.login(TestFixtures::credentials()).await.unwrap_err();

        assert!(matches!(err, KeyAuthError::InvalidCredentials));
        assert!(auth.current_token().is_none());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_previous_session() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, TestFixtures::login_body("first-token"));
        transport.push_json(400, json!({"detail": "bad request"}));
        let mut auth = session_with(&transport);

        auth.login(TestFixtures::credentials()).await.unwrap();
        assert!(auth.login(TestFixtures::credentials()).await.is_err());

        assert_eq!(auth.current_token(), Some("first-token"));
    }

    #[tokio::test]
    async fn test_server_and_network_errors() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(503, json!({"detail": "maintenance"}));
        transport.push_error(TransportError::Timeout(Duration::from_secs(5)));
        let mut auth = session_with(&transport);

        let server = auth.login(TestFixtures::credentials()).await.unwrap_err();
        assert!(matches!(server, KeyAuthError::Server { status: 503, .. }));

        let network = auth.login(TestFixtures::credentials()).await.unwrap_err();
        assert!(matches!(
            network,
            KeyAuthError::Network(TransportError::Timeout(_))
        ));
        assert!(!auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let transport = Arc::new(MockTransport::new());
        transport.push_raw(200, "{\"token\": \"wrong shape\"}");
        transport.push_json(200, TestFixtures::login_body(""));
        transport.push_json(
            200,
            json!({"access_token": "t", "token_type": "mac", "user_id": 1, "username": "alice"}),
        );
        let mut auth = session_with(&transport);

        for _ in 0..3 {
            let err = auth.login(TestFixtures::credentials()).await.unwrap_err();
            assert!(matches!(err, KeyAuthError::MalformedResponse(_)));
            assert!(auth.current_token().is_none());
        }
    }

    #[tokio::test]
    async fn test_logout_clears_token() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, TestFixtures::login_body("token-abc"));
        let mut auth = session_with(&transport);

        auth.login(TestFixtures::credentials()).await.unwrap();
        let ended = auth.logout().unwrap();

        assert_eq!(ended.username, "alice");
        assert!(auth.current_token().is_none());
        assert!(auth.logout().is_none());
    }

    #[tokio::test]
    async fn test_fetch_profile_requires_session() {
        let transport = Arc::new(MockTransport::new());
        let mut auth = session_with(&transport);

        let err = auth.fetch_profile().await.unwrap_err();

        assert!(matches!(err, KeyAuthError::NotAuthenticated));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_profile_with_bearer() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, TestFixtures::login_body("token-abc"));
        transport.push_json(
            200,
            json!({"id": 42, "username": "alice", "email": "alice@example.com", "is_admin": false}),
        );
        let mut auth = session_with(&transport);

        auth.login(TestFixtures::credentials()).await.unwrap();
        let profile = auth.fetch_profile().await.unwrap();

        assert_eq!(profile.id, 42);
        assert_eq!(profile.email.as_deref(), Some("alice@example.com"));
        let requests = transport.requests();
        assert_eq!(requests[1].path, PROFILE_PATH);
        assert_eq!(requests[1].bearer.as_deref(), Some("token-abc"));
    }

    #[tokio::test]
    async fn test_expired_token_drops_session() {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(200, TestFixtures::login_body("token-abc"));
        transport.push_json(401, json!({"detail": "Could not validate credentials"}));
        let mut auth = session_with(&transport);

        auth.login(TestFixtures::credentials()).await.unwrap();
        let err = auth.fetch_profile().await.unwrap_err();

        assert!(matches!(err, KeyAuthError::NotAuthenticated));
        assert!(!auth.is_authenticated());
    }
}

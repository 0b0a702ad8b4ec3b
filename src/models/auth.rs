//! Authentication data types
//!
//! Credentials and sessions are never serialized back out of the client, and
//! their `Debug` output hides secrets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::logging::mask_secret;

/// Username/password pair used for a single login call
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authenticated session obtained from `/auth/login`
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Bearer token attached to every authenticated request
    pub token: String,
    pub token_type: String,
    pub issued_at: DateTime<Utc>,
    pub user_id: i64,
    pub username: String,
    pub is_admin: bool,
}

impl Session {
    /// Value for the `Authorization` header
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &mask_secret(&self.token))
            .field("token_type", &self.token_type)
            .field("issued_at", &self.issued_at)
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("is_admin", &self.is_admin)
            .finish()
    }
}

/// Profile of the logged-in user as returned by `/auth/me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

// Wire types

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: i64,
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
}

//! License projections visible to the client
//!
//! The service owns the full license record (key, bound HWID, type, expiry).
//! The client only ever sees the activation and validation answers below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::timestamp;

/// Known license plans; unknown plans from newer servers are kept verbatim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseType {
    Trial,
    Monthly,
    Lifetime,
    Other(String),
}

impl From<&str> for LicenseType {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "trial" => Self::Trial,
            "monthly" => Self::Monthly,
            "lifetime" => Self::Lifetime,
            _ => Self::Other(value.to_string()),
        }
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trial => write!(f, "trial"),
            Self::Monthly => write!(f, "monthly"),
            Self::Lifetime => write!(f, "lifetime"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Answer to a successful activation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationResult {
    pub license_type: String,
    /// `None` means the license never expires
    pub expires_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
}

impl ActivationResult {
    #[must_use]
    pub fn kind(&self) -> LicenseType {
        LicenseType::from(self.license_type.as_str())
    }
}

/// Answer to every validation attempt
///
/// `valid == false` is a normal outcome (expired, wrong machine, unknown key),
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub license_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub message: Option<String>,
    /// Machine-readable rejection reason, e.g. `expired` or `invalid`
    pub reason: Option<String>,
}

impl ValidationResult {
    /// Build a rejection carrying only a message
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            license_type: None,
            expires_at: None,
            message: Some(message.into()),
            reason: None,
        }
    }

    /// Whether the license carries an expiry that is already past at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    #[must_use]
    pub fn kind(&self) -> Option<LicenseType> {
        self.license_type.as_deref().map(LicenseType::from)
    }

    /// Human-readable rendering of the outcome, e.g. "License expired on 2024-05-01"
    #[must_use]
    pub fn describe(&self) -> String {
        if self.valid {
            let plan = self
                .license_type
                .as_deref()
                .map_or_else(String::new, |plan| format!(" ({plan})"));
            return match self.expires_at {
                Some(expires_at) => format!(
                    "License is valid{plan}, expires on {}",
                    expires_at.format("%Y-%m-%d %H:%M UTC")
                ),
                None => format!("License is valid{plan}, no expiry"),
            };
        }

        if let Some(expires_at) = self.expires_at.filter(|_| self.is_expired_at(Utc::now())) {
            return format!("License expired on {}", expires_at.format("%Y-%m-%d"));
        }

        match self.message.as_deref() {
            Some(message) if !message.is_empty() => format!("License is not valid: {message}"),
            _ => "License is not valid".to_string(),
        }
    }
}

/// One entry of `/license/status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseSummary {
    pub key: String,
    #[serde(rename = "type")]
    pub license_type: String,
    pub status: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_valid: bool,
}

// Wire types

#[derive(Debug, Deserialize)]
pub(crate) struct ActivateResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub license_type: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<ActivateResponse> for ActivationResult {
    fn from(response: ActivateResponse) -> Self {
        Self {
            license_type: response.license_type,
            expires_at: response.expires_at,
            message: response.message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ValidateResponse {
    pub valid: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub license_type: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl From<ValidateResponse> for ValidationResult {
    fn from(response: ValidateResponse) -> Self {
        Self {
            valid: response.valid,
            license_type: response.license_type,
            expires_at: response.expires_at,
            message: response.message,
            reason: response.reason,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    pub licenses: Vec<LicenseSummary>,
}

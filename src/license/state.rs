//! Client-observable licensing state

use chrono::{DateTime, Utc};
use std::fmt;

use crate::hwid::HardwareId;

/// License held by this client after a successful activation or validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveLicense {
    pub license_key: String,
    pub license_type: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Identifier the license was last confirmed against
    pub hwid: HardwareId,
    pub confirmed_at: DateTime<Utc>,
}

/// Where the client stands in the login/activation lifecycle
///
/// ```text
/// Unauthenticated --login--> Authenticated --activate/validate ok--> LicenseActive
/// LicenseActive --validate valid=false--> Authenticated
/// Authenticated/LicenseActive --HTTP 401 on any call--> Unauthenticated
/// ```
///
/// Transport and server failures never change the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseState {
    Unauthenticated,
    Authenticated,
    LicenseActive(ActiveLicense),
}

impl LicenseState {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticated => "authenticated",
            Self::LicenseActive(_) => "license_active",
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Unauthenticated)
    }

    /// License controls (activate/validate) should only be offered when true
    #[must_use]
    pub fn license_controls_enabled(&self) -> bool {
        self.is_authenticated()
    }

    #[must_use]
    pub fn active_license(&self) -> Option<&ActiveLicense> {
        match self {
            Self::LicenseActive(license) => Some(license),
            _ => None,
        }
    }
}

impl fmt::Display for LicenseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

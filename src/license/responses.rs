//! Interpretation of license endpoint responses
//!
//! Activation turns 4xx answers into typed errors the caller must branch on.
//! Validation turns them into `valid = false` results, since "not valid" is a
//! routine answer for a polled check.

use chrono::{DateTime, Utc};

use crate::error::{KeyAuthError, KeyAuthResult};
use crate::models::license::{ActivateResponse, StatusResponse, ValidateResponse};
use crate::models::{ActivationResult, LicenseSummary, ValidationResult};
use crate::transport::ApiResponse;

const BOUND_ELSEWHERE_MARKERS: &[&str] = &[
    "different hardware",
    "another user",
    "another machine",
    "already bound",
    "already activated",
    "hardware id mismatch",
];

fn names_other_binding(detail: &str) -> bool {
    let detail = detail.to_ascii_lowercase();
    BOUND_ELSEWHERE_MARKERS
        .iter()
        .any(|marker| detail.contains(marker))
}

/// Map an activation response to its result or typed error
///
/// # Errors
///
/// - `KeyAlreadyBoundElsewhere` for 409, 403, or a detail naming another binding
/// - `KeyInvalid` for every other 4xx
/// - `Server` for 5xx, `MalformedResponse` for undecodable 2xx bodies
pub fn interpret_activation(response: &ApiResponse) -> KeyAuthResult<ActivationResult> {
    if response.is_success() {
        let decoded: ActivateResponse = response.json()?;
        return Ok(decoded.into());
    }
    if response.is_server_error() {
        return Err(response.server_error());
    }
    if response.is_client_error() {
        let detail = response
            .detail()
            .unwrap_or_else(|| format!("rejected with HTTP {}", response.status));
        if matches!(response.status, 403 | 409) || names_other_binding(&detail) {
            return Err(KeyAuthError::KeyAlreadyBoundElsewhere(detail));
        }
        return Err(KeyAuthError::KeyInvalid(detail));
    }
    Err(response.unexpected_status())
}

/// Map a validation response to a result; semantic rejection is `valid = false`
///
/// A `valid = true` answer whose expiry is already past at `now` is downgraded,
/// and a rejection without a message receives one.
///
/// # Errors
///
/// Returns `Server` for 5xx and `MalformedResponse` for undecodable 2xx bodies.
pub fn interpret_validation(
    response: &ApiResponse,
    now: DateTime<Utc>,
) -> KeyAuthResult<ValidationResult> {
    if response.is_server_error() {
        return Err(response.server_error());
    }
    if response.is_client_error() {
        let detail = response
            .detail()
            .unwrap_or_else(|| format!("rejected with HTTP {}", response.status));
        return Ok(ValidationResult::rejected(detail));
    }
    if !response.is_success() {
        return Err(response.unexpected_status());
    }

    let decoded: ValidateResponse = response.json()?;
    let mut result = ValidationResult::from(decoded);

    if result.valid && result.is_expired_at(now) {
        if let Some(expires_at) = result.expires_at {
            result.valid = false;
            result.message = Some(format!("license expired on {}", expires_at.format("%Y-%m-%d")));
            result.reason = Some("expired".to_string());
        }
    }

    if !result.valid && result.message.as_deref().is_none_or(str::is_empty) {
        let message = match result.reason.as_deref() {
            Some("expired") => "license has expired".to_string(),
            Some(reason) if !reason.is_empty() => format!("license is not valid ({reason})"),
            _ => "license is not valid".to_string(),
        };
        result.message = Some(message);
    }

    Ok(result)
}

/// Map a `/license/status` response to the user's licenses
///
/// # Errors
///
/// Returns `Server` for 5xx, `MalformedResponse` for other non-success statuses
/// or undecodable bodies.
pub fn interpret_status(response: &ApiResponse) -> KeyAuthResult<Vec<LicenseSummary>> {
    if response.is_success() {
        let decoded: StatusResponse = response.json()?;
        return Ok(decoded.licenses);
    }
    if response.is_server_error() {
        return Err(response.server_error());
    }
    Err(KeyAuthError::MalformedResponse(format!(
        "license status rejected with HTTP {}: {}",
        response.status,
        response.detail().unwrap_or_default()
    )))
}

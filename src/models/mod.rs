//! Data types exchanged with the KeyAuth service
//!
//! [`auth`] holds credentials, sessions and user profiles; [`license`] holds the
//! client-visible projections of a server-held license record.

pub mod auth;
pub mod license;

pub use auth::{Credentials, Session, UserProfile};
pub use license::{ActivationResult, LicenseSummary, LicenseType, ValidationResult};

/// Lenient decoding of the service's optional ISO-8601 timestamps
///
/// The service may emit RFC 3339 values or naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// values; naive values are interpreted as UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    /// Parse a single timestamp string
    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(parsed.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .map(|naive| naive.and_utc())
    }

    /// Deserialize `null`, a missing field, or a timestamp string
    pub fn deserialize_optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(text) if text.trim().is_empty() => Ok(None),
            Some(text) => parse(&text)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {text}"))),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::{Datelike, Timelike};

        #[test]
        fn test_parse_rfc3339_with_offset() {
            let parsed = parse("2030-06-01T12:00:00+02:00").unwrap();
            assert_eq!(parsed.hour(), 10);
        }

        #[test]
        fn test_parse_naive_as_utc() {
            let parsed = parse("2030-06-01T12:30:15.123456").unwrap();
            assert_eq!(parsed.year(), 2030);
            assert_eq!(parsed.hour(), 12);
            assert_eq!(parsed.minute(), 30);
        }

        #[test]
        fn test_parse_rejects_garbage() {
            assert!(parse("next tuesday").is_none());
        }
    }
}

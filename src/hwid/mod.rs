//! Hardware identity for license binding
//!
//! Resolves a best-effort-stable identifier for the current machine. The system
//! UUID is tried first and the processor identifier second; if neither yields a
//! usable value, resolution fails rather than substituting a placeholder, since
//! a placeholder would bind every such machine to the same license.
//!
//! Identifiers are not guaranteed to survive major hardware changes or
//! re-provisioning of a virtual machine.

pub mod sources;

use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

use crate::error::{KeyAuthError, KeyAuthResult};
use crate::utils::logging::LoggingHelper;
pub use sources::{IdentitySource, ProcessorIdSource, SystemUuidSource};

/// Where a hardware identifier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HwidSource {
    SystemUuid,
    ProcessorId,
    Unknown,
}

impl fmt::Display for HwidSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemUuid => write!(f, "system UUID"),
            Self::ProcessorId => write!(f, "processor ID"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A resolved, non-empty machine identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HardwareId {
    value: String,
    source: HwidSource,
}

impl HardwareId {
    /// Wrap an identifier; returns `None` for empty values
    #[must_use]
    pub fn new(value: impl Into<String>, source: HwidSource) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            None
        } else {
            Some(Self { value, source })
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn source(&self) -> HwidSource {
        self.source
    }
}

impl fmt::Display for HardwareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Resolves the machine identifier from an ordered list of sources
pub struct HardwareIdentity {
    sources: Vec<Box<dyn IdentitySource>>,
    cache_for_process: bool,
    cached: OnceLock<HardwareId>,
}

impl HardwareIdentity {
    /// Primary source first, fallback second
    #[must_use]
    pub fn new(primary: Box<dyn IdentitySource>, fallback: Box<dyn IdentitySource>) -> Self {
        Self::from_sources(vec![primary, fallback])
    }

    #[must_use]
    pub fn from_sources(sources: Vec<Box<dyn IdentitySource>>) -> Self {
        Self {
            sources,
            cache_for_process: false,
            cached: OnceLock::new(),
        }
    }

    /// The platform sources: system UUID, then processor identifier
    #[must_use]
    pub fn system() -> Self {
        Self::new(Box::new(SystemUuidSource), Box::new(ProcessorIdSource))
    }

    /// Keep the first successfully resolved identifier for the life of this value
    #[must_use]
    pub fn with_process_cache(mut self, enabled: bool) -> Self {
        self.cache_for_process = enabled;
        self
    }

    /// Resolve the identifier, falling back through the sources in order
    ///
    /// # Errors
    ///
    /// Returns `KeyAuthError::IdentityUnavailable` listing each source's failure
    /// when no source yields a usable value.
    pub fn resolve(&self) -> KeyAuthResult<HardwareId> {
        if let Some(cached) = self.cached.get() {
            return Ok(cached.clone());
        }

        let mut failures = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let attempt = source
                .read()
                .and_then(|raw| sources::sanitize_identifier(source.name(), source.kind(), &raw));
            match attempt {
                Ok(value) => {
                    if let Some(hwid) = HardwareId::new(value, source.kind()) {
                        LoggingHelper::log_hwid_resolved(&hwid);
                        if self.cache_for_process {
                            let _ = self.cached.set(hwid.clone());
                        }
                        return Ok(hwid);
                    }
                }
                Err(err) => {
                    LoggingHelper::log_hwid_source_failed(source.name(), &err.to_string());
                    failures.push(err.to_string());
                }
            }
        }

        if failures.is_empty() {
            failures.push("no identity sources configured".to_string());
        }
        Err(KeyAuthError::IdentityUnavailable(failures.join("; ")))
    }
}

impl Default for HardwareIdentity {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for HardwareIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("HardwareIdentity")
            .field("sources", &names)
            .field("cache_for_process", &self.cache_for_process)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mock::MockIdentitySource;

    #[test]
    fn test_primary_source_wins() {
        let identity = HardwareIdentity::new(
            Box::new(MockIdentitySource::available(
                HwidSource::SystemUuid,
                "4c4c4544-0033-5910-8052-b4c04f4e4b32",
            )),
            Box::new(MockIdentitySource::available(
                HwidSource::ProcessorId,
                "BFEBFBFF000806EC",
            )),
        );

        let hwid = identity.resolve().unwrap();
        assert_eq!(hwid.source(), HwidSource::SystemUuid);
        assert_eq!(hwid.value(), "4C4C4544-0033-5910-8052-B4C04F4E4B32");
    }

    #[test]
    fn test_falls_back_to_processor_id() {
        let identity = HardwareIdentity::new(
            Box::new(MockIdentitySource::unavailable(HwidSource::SystemUuid)),
            Box::new(MockIdentitySource::available(
                HwidSource::ProcessorId,
                "BFEBFBFF000806EC",
            )),
        );

        let hwid = identity.resolve().unwrap();
        assert_eq!(hwid.source(), HwidSource::ProcessorId);
        assert_eq!(hwid.value(), "BFEBFBFF000806EC");
    }

    #[test]
    fn test_placeholder_primary_falls_back() {
        let identity = HardwareIdentity::new(
            Box::new(MockIdentitySource::available(
                HwidSource::SystemUuid,
                "FFFFFFFF-FFFF-FFFF-FFFF-FFFFFFFFFFFF",
            )),
            Box::new(MockIdentitySource::available(
                HwidSource::ProcessorId,
                "BFEBFBFF000806EC",
            )),
        );

        assert_eq!(identity.resolve().unwrap().source(), HwidSource::ProcessorId);
    }

    #[test]
    fn test_both_sources_unavailable() {
        let identity = HardwareIdentity::new(
            Box::new(MockIdentitySource::unavailable(HwidSource::SystemUuid)),
            Box::new(MockIdentitySource::available(HwidSource::ProcessorId, "  ")),
        );

        match identity.resolve() {
            Err(KeyAuthError::IdentityUnavailable(reason)) => {
                assert!(reason.contains("mock system UUID"));
                assert!(reason.contains("mock processor ID"));
            }
            other => panic!("expected IdentityUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_no_sources_configured() {
        let identity = HardwareIdentity::from_sources(Vec::new());
        assert!(matches!(
            identity.resolve(),
            Err(KeyAuthError::IdentityUnavailable(_))
        ));
    }

    #[test]
    fn test_recomputed_without_cache() {
        let source = MockIdentitySource::available(HwidSource::SystemUuid, "machine-a");
        let reads = source.read_counter();
        let identity = HardwareIdentity::from_sources(vec![Box::new(source)]);

        identity.resolve().unwrap();
        identity.resolve().unwrap();
        assert_eq!(reads.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_process_cache_reads_once() {
        let source = MockIdentitySource::available(HwidSource::SystemUuid, "machine-a");
        let reads = source.read_counter();
        let identity =
            HardwareIdentity::from_sources(vec![Box::new(source)]).with_process_cache(true);

        let first = identity.resolve().unwrap();
        let second = identity.resolve().unwrap();
        assert_eq!(first, second);
        assert_eq!(reads.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hardware_id_rejects_empty() {
        assert!(HardwareId::new("", HwidSource::Unknown).is_none());
        assert!(HardwareId::new("abc", HwidSource::Unknown).is_some());
    }
}

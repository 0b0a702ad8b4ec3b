#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Client for the KeyAuth licensing service
//!
//! Logs a user in, derives a hardware ID for the current machine, and binds or
//! checks license keys against that ID. [`LicenseController`] is the entry
//! point; it owns an [`AuthSession`] and a [`HardwareIdentity`] and refuses
//! license calls locally until a session exists.

/// Version of the keyauth client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod hwid;
pub mod license;
pub mod models;
pub mod session;
pub mod settings;
pub mod transport;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use error::{IdentityError, KeyAuthError, KeyAuthResult, TransportError};
pub use hwid::{HardwareId, HardwareIdentity, HwidSource, IdentitySource};
pub use license::{ActiveLicense, LicenseController, LicenseState};
pub use models::{
    ActivationResult, Credentials, LicenseSummary, LicenseType, Session, UserProfile,
    ValidationResult,
};
pub use session::AuthSession;
pub use settings::KeyAuthSettings;
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

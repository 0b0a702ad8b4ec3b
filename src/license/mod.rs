//! License activation and validation
//!
//! [`LicenseController`] owns the session and hardware identity and enforces the
//! client-side lifecycle; [`responses`] holds the status-to-outcome mapping.

pub mod controller;
pub mod responses;
pub mod state;

pub use controller::LicenseController;
pub use state::{ActiveLicense, LicenseState};

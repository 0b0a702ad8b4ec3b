//! Testing utilities for keyauth
//!
//! Available to unit tests and, with the `testing` feature, to integration tests.
//!
//! - [`fixtures`] - Canned credentials and service response bodies
//! - [`mock`] - Scripted transport and identity sources
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use keyauth::testing::{fixtures::TestFixtures, mock::MockTransport};
//! use keyauth::LicenseController;
//!
//! let transport = Arc::new(MockTransport::new());
//! transport.push_json(200, TestFixtures::login_body("token"));
//! let controller = LicenseController::new(transport.clone(), TestFixtures::identity("machine"));
//! assert!(!controller.state().is_authenticated());
//! ```

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::{MockIdentitySource, MockTransport};

/// Common test constants
pub mod constants {
    /// Default test username
    pub const TEST_USERNAME: &str = "alice";

    /// Default test password
    pub const TEST_PASSWORD: &str = "correct horse";

    /// Default test user ID
    pub const TEST_USER_ID: i64 = 42;

    /// Default test license key
    pub const TEST_LICENSE_KEY: &str = "KA-TRIAL-0001";
}

//! User authentication and session token handling

pub mod auth;

pub use auth::AuthSession;

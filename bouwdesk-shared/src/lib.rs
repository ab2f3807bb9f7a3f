//! # BouwDesk Shared Library
//!
//! Shared types and business logic used by the BouwDesk API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Passwords, tokens, API keys and the permission engine
//! - `billing`: Plan catalog and payment processor integration
//! - `gateway`: Rate limiting and usage analytics
//! - `quota`: Plan-based resource limits
//! - `db`: Connection pooling and migrations

pub mod auth;
pub mod billing;
pub mod db;
pub mod gateway;
pub mod models;
pub mod quota;

/// Current version of the BouwDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

//! # Corkboard Shared Library
//!
//! This crate contains the models, authentication primitives, and realtime
//! plumbing shared between the Corkboard API server and any future services.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Token codec, identity resolution, and authorization
//! - `realtime`: Redis-backed broadcast topics
//! - `webhooks`: Outbound webhook delivery
//! - `db`: Connection pool helpers

pub mod auth;
pub mod db;
pub mod models;
pub mod realtime;
pub mod webhooks;

/// Current version of the Corkboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

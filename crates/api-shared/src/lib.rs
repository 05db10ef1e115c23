//! # API Shared
//!
//! Shared utilities and definitions for CERA APIs.
//!
//! Contains:
//! - Request/response types exchanged over the REST boundary (`types` module)
//! - Shared services like `HealthService`
//! - Actor resolution and API-key validation (`auth` module)
//!
//! Used by `api-rest` and the CLI for common functionality.

pub mod auth;
pub mod health;
pub mod types;

pub use health::HealthService;
pub use types::*;

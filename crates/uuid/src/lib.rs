//! Application identifiers and sharded-path utilities.
//!
//! CERA stores each ethics application under a sharded directory derived from
//! its UUID.
//!
//! To keep path derivation deterministic and consistent across the codebase,
//! CERA uses a *canonical* UUID representation for storage identifiers:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! This module provides:
//! - A small wrapper type ([`ApplicationUuid`]) that *guarantees* the canonical
//!   format once constructed.
//! - Shared sharding logic to derive application directory locations from an
//!   identifier.
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Notes:
//! - This is the same value you would get from `Uuid::new_v4().simple().to_string()`.
//! - Canonical form is *required* for externally supplied identifiers (for
//!   example, from CLI/API inputs). Use [`ApplicationUuid::parse`] to validate
//!   an input string.
//! - Non-canonical values (uppercase, hyphenated, wrong length, non-hex) are
//!   rejected.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, CERA stores data under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `application_data/applications/55/0e/550e8400e29b41d4a716446655440000/`
//!
//! This scheme prevents very large fan-out in a single directory once the
//! committee has processed many thousands of applications.

mod service;

pub use service::{ApplicationUuid, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;

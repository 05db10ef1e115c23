//! Internal implementation of the canonical application identifier.

use crate::{UuidError, UuidResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// CERA's canonical application identifier (32 lowercase hex characters, no hyphens).
///
/// This wrapper type guarantees that once constructed, the contained UUID is in
/// CERA's canonical format. It provides type safety for identifier operations
/// and ensures consistent path derivation across the system.
///
/// # When to use this type
/// Use this wrapper whenever you are:
/// - Accepting an application id from *outside* the core (CLI input, API
///   request, etc), or
/// - Deriving a sharded storage path for an application, or
/// - Allocating a fresh identifier during application creation.
///
/// Once you have an `ApplicationUuid`, you can safely assume the internal UUID
/// is valid and in canonical form.
///
/// # Construction
/// - [`ApplicationUuid::new`] generates a new canonical UUID (for new records).
/// - [`ApplicationUuid::parse`] validates an externally supplied identifier.
///
/// # Display format
/// When displayed or converted to string, `ApplicationUuid` always produces the
/// canonical 32-character lowercase hex format without hyphens.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApplicationUuid(Uuid);

impl Default for ApplicationUuid {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationUuid {
    /// Generates a new identifier in CERA's canonical form.
    ///
    /// This is suitable for allocating a fresh identifier during application
    /// creation. The generated UUID follows RFC 4122 version 4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier string that must already be in
    /// CERA's canonical form.
    ///
    /// This does **not** normalise other common UUID forms (for example,
    /// hyphenated or uppercase). Callers must provide the canonical
    /// representation.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if Self::is_canonical(input) {
            // SAFETY: is_canonical guarantees valid hex, so parse_str will succeed
            let uuid = Uuid::parse_str(input).expect("is_canonical guarantees valid UUID");
            return Ok(Self(uuid));
        }
        Err(UuidError::InvalidInput(format!(
            "application id must be 32 lowercase hex characters without hyphens, got: '{}'",
            input
        )))
    }

    /// Returns the identifier as a `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in CERA's canonical identifier form.
    ///
    /// This is a purely syntactic check that validates:
    /// - Exactly 32 bytes long
    /// - Contains only lowercase hex characters (`0-9` and `a-f`)
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<uuid>/` where `s1`/`s2` are derived from
    /// this identifier.
    ///
    /// This implements CERA's sharding scheme:
    /// - `s1` is the first two hex characters of the UUID
    /// - `s2` is the next two hex characters
    /// - The full UUID forms the leaf directory
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl fmt::Display for ApplicationUuid {
    /// Formats the identifier in canonical form (32 lowercase hex characters).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for ApplicationUuid {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationUuid::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ApplicationUuid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ApplicationUuid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ApplicationUuid::parse(&s).map_err(serde::de::Error::custom)
    }
}

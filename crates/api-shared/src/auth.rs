//! Actor resolution for API requests.
//!
//! Authentication itself is a non-goal of this system: an external
//! collaborator authenticates the caller and forwards the resolved identity
//! as headers. This module turns those headers into a typed
//! [`Actor`] and optionally gates requests on a shared API key, so every
//! transport uses the same rules.

use cera_core::{Actor, EmailAddress, NonEmptyText, Role};
use std::env;
use std::str::FromStr;

/// Header carrying the caller's stable identifier.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the caller's display name.
pub const ACTOR_NAME_HEADER: &str = "x-actor-name";
/// Header carrying the caller's email address.
pub const ACTOR_EMAIL_HEADER: &str = "x-actor-email";
/// Header carrying the caller's resolved role.
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing header: {0}")]
    MissingHeader(&'static str),
    #[error("invalid header {header}: {reason}")]
    InvalidHeader {
        header: &'static str,
        reason: String,
    },
    #[error("API_KEY not set in environment")]
    ApiKeyNotConfigured,
    #[error("invalid API key")]
    InvalidApiKey,
}

/// The actor headers of one request, as raw string values.
///
/// The transport layer extracts these from its own header type; keeping the
/// input as plain strings keeps this crate transport-agnostic.
#[derive(Clone, Copy, Debug, Default)]
pub struct ActorHeaders<'a> {
    pub id: Option<&'a str>,
    pub name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub role: Option<&'a str>,
}

/// Resolve a typed [`Actor`] from the request headers.
///
/// # Errors
///
/// Returns `AuthError::MissingHeader` for an absent header and
/// `AuthError::InvalidHeader` for one that fails validation (empty id/name,
/// malformed email, unknown role).
pub fn resolve_actor(headers: ActorHeaders<'_>) -> Result<Actor, AuthError> {
    let id = headers
        .id
        .ok_or(AuthError::MissingHeader(ACTOR_ID_HEADER))?;
    let name = headers
        .name
        .ok_or(AuthError::MissingHeader(ACTOR_NAME_HEADER))?;
    let email = headers
        .email
        .ok_or(AuthError::MissingHeader(ACTOR_EMAIL_HEADER))?;
    let role = headers
        .role
        .ok_or(AuthError::MissingHeader(ACTOR_ROLE_HEADER))?;

    let id = NonEmptyText::new(id).map_err(|e| AuthError::InvalidHeader {
        header: ACTOR_ID_HEADER,
        reason: e.to_string(),
    })?;
    let name = NonEmptyText::new(name).map_err(|e| AuthError::InvalidHeader {
        header: ACTOR_NAME_HEADER,
        reason: e.to_string(),
    })?;
    let email = EmailAddress::parse(email).map_err(|e| AuthError::InvalidHeader {
        header: ACTOR_EMAIL_HEADER,
        reason: e.to_string(),
    })?;
    let role = Role::from_str(role).map_err(|e| AuthError::InvalidHeader {
        header: ACTOR_ROLE_HEADER,
        reason: e.to_string(),
    })?;

    Ok(Actor {
        id,
        name,
        email,
        role,
    })
}

/// Validates the provided API key against the expected API key from environment.
///
/// Returns `Ok(())` if the key is valid, or an error if invalid or missing.
pub fn validate_api_key(provided_key: &str) -> Result<(), AuthError> {
    let expected_key = env::var("API_KEY").map_err(|_| AuthError::ApiKeyNotConfigured)?;

    if provided_key == expected_key {
        Ok(())
    } else {
        Err(AuthError::InvalidApiKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_headers<'a>() -> ActorHeaders<'a> {
        ActorHeaders {
            id: Some("user-1"),
            name: Some("Ada Reviewer"),
            email: Some("ada@example.org"),
            role: Some("reviewer"),
        }
    }

    #[test]
    fn resolves_a_complete_header_set() {
        let actor = resolve_actor(full_headers()).unwrap();
        assert_eq!(actor.id.as_str(), "user-1");
        assert_eq!(actor.role, Role::Reviewer);
    }

    #[test]
    fn missing_id_is_reported_by_header_name() {
        let mut headers = full_headers();
        headers.id = None;

        let err = resolve_actor(headers).unwrap_err();
        assert!(matches!(err, AuthError::MissingHeader(ACTOR_ID_HEADER)));
    }

    #[test]
    fn unknown_role_is_invalid() {
        let mut headers = full_headers();
        headers.role = Some("auditor");

        let err = resolve_actor(headers).unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidHeader {
                header: ACTOR_ROLE_HEADER,
                ..
            }
        ));
    }

    #[test]
    fn malformed_email_is_invalid() {
        let mut headers = full_headers();
        headers.email = Some("not-an-email");

        let err = resolve_actor(headers).unwrap_err();
        assert!(matches!(
            err,
            AuthError::InvalidHeader {
                header: ACTOR_EMAIL_HEADER,
                ..
            }
        ));
    }
}

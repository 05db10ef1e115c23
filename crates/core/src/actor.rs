//! Actor identity for workflow operations.
//!
//! An [`Actor`] is the already-authenticated caller of a core operation:
//! the surrounding auth collaborator resolves identity and role, the core
//! consumes them. The actor's name and email sign the git commit recorded
//! for the operation; id and role are rendered as structured commit
//! trailers.

use crate::application::Role;
use cera_types::{EmailAddress, NonEmptyText};

/// Represents the actor performing a create or transition operation.
#[derive(Clone, Debug)]
pub struct Actor {
    /// Stable identifier of the actor within the committee's user base.
    pub id: NonEmptyText,

    /// The full name of the actor.
    pub name: NonEmptyText,

    /// The email address of the actor.
    pub email: EmailAddress,

    /// The resolved role the actor holds for this call.
    pub role: Role,
}

//! Mutual-exclusion scopes for shared mutable state.
//!
//! Two resources require exclusive-access discipline rather than
//! optimistic retry: the per-application status (its audit trail cannot
//! tolerate lost updates) and the global sequence registry consulted at
//! creation. The registry hands out one mutex per application id, lazily,
//! plus one global creation mutex.
//!
//! Every acquisition goes through `Mutex::try_lock_for` with the
//! configured bounded wait; a timeout surfaces as
//! [`ApplicationError::Contention`](crate::error::ApplicationError::Contention)
//! at the call site, with nothing written.

use cera_uuid::{ApplicationUuid, Uuid};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of application-scoped and creation-scoped mutexes.
///
/// Shared between the workflow engine and the application service through
/// an `Arc` so that every entry point for a given process serialises on
/// the same locks.
#[derive(Default)]
pub struct LockRegistry {
    creation: Arc<Mutex<()>>,
    applications: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The global mutex serialising identifier generation and record
    /// creation.
    pub fn creation_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.creation)
    }

    /// The mutex serialising transitions on a single application.
    ///
    /// Entries are allocated on first use and live for the lifetime of
    /// the registry; the map is bounded by the number of distinct
    /// applications touched by this process.
    pub fn application_lock(&self, id: &ApplicationUuid) -> Arc<Mutex<()>> {
        let mut map = self.applications.lock();
        Arc::clone(map.entry(id.uuid()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn same_application_yields_same_lock() {
        let registry = LockRegistry::new();
        let id = ApplicationUuid::new();

        let a = registry.application_lock(&id);
        let b = registry.application_lock(&id);

        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_applications_yield_different_locks() {
        let registry = LockRegistry::new();

        let a = registry.application_lock(&ApplicationUuid::new());
        let b = registry.application_lock(&ApplicationUuid::new());

        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn held_lock_times_out_for_second_taker() {
        let registry = LockRegistry::new();
        let id = ApplicationUuid::new();

        let lock = registry.application_lock(&id);
        let _guard = lock.lock();

        let other = registry.application_lock(&id);
        assert!(other.try_lock_for(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn creation_lock_is_process_wide() {
        let registry = LockRegistry::new();

        let a = registry.creation_lock();
        let b = registry.creation_lock();

        assert!(Arc::ptr_eq(&a, &b));
    }
}

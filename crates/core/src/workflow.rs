//! The status workflow engine.
//!
//! [`WorkflowEngine::apply_transition`] is the single write path for an
//! application's lifecycle after creation. One call, performed under the
//! application's lock, does all of:
//!
//! 1. read the current status,
//! 2. validate the requested edge, the caller's role and (for owner-gated
//!    events) ownership against the [`policy`] table,
//! 3. write the new status (setting `date_submitted` on submit edges),
//! 4. append one [`StatusHistoryEntry`],
//! 5. append one [`ReviewRecord`] when the caller is a reviewer,
//!
//! committing steps 3–5 as one git commit with rollback, so a failure at
//! any point leaves the previous state exactly as it was. No application
//! is ever observable in a state its history does not explain.
//!
//! History timestamps are strictly monotonic per application: while the
//! lock is held, a timestamp that would not advance past the previous
//! entry is bumped by one millisecond.

use crate::actor::Actor;
use crate::application::{
    ApplicationStatus, ReviewRecord, Role, StatusHistoryEntry, TransitionEvent,
};
use crate::config::CoreConfig;
use crate::constants::{APPLICATION_FILE_NAME, HISTORY_FILE_NAME, REVIEWS_FILE_NAME};
use crate::error::{ApplicationError, ApplicationResult};
use crate::locks::LockRegistry;
use crate::policy;
use crate::store::ApplicationStore;
use crate::versioned_files::{
    CommitAction, CommitDomain, CommitMessage, FileToWrite, VersionedFileService,
};
use cera_uuid::ApplicationUuid;
use chrono::{DateTime, Duration, Utc};
use std::path::Path;
use std::sync::Arc;

/// Executes status transitions.
#[derive(Clone)]
pub struct WorkflowEngine {
    cfg: Arc<CoreConfig>,
    store: ApplicationStore,
    locks: Arc<LockRegistry>,
}

impl WorkflowEngine {
    pub fn new(cfg: Arc<CoreConfig>, locks: Arc<LockRegistry>) -> Self {
        Self {
            store: ApplicationStore::new(cfg.clone()),
            cfg,
            locks,
        }
    }

    /// Apply `event` to the application, returning the new status.
    ///
    /// # Errors
    ///
    /// - [`ApplicationError::Contention`] if the application lock cannot be
    ///   acquired within the configured wait (nothing written; retryable).
    /// - [`ApplicationError::NotFound`] if no such application exists.
    /// - [`ApplicationError::InvalidTransition`] if `(status, event)` is not
    ///   an edge of the workflow table, the caller's role does not match the
    ///   event, or an owner-gated event is attempted by a non-owner.
    /// - A persistence error if the commit fails; the previous on-disk state
    ///   is restored before the error is returned.
    pub fn apply_transition(
        &self,
        id: &ApplicationUuid,
        event: TransitionEvent,
        actor: &Actor,
        comment: Option<String>,
    ) -> ApplicationResult<ApplicationStatus> {
        let lock = self.locks.application_lock(id);
        let _guard = lock
            .try_lock_for(self.cfg.lock_wait())
            .ok_or(ApplicationError::Contention)?;

        let mut application = self.store.load_application(id)?;
        let from = application.status;

        let target = policy::transition_target(from, event)
            .ok_or(ApplicationError::InvalidTransition { from, event })?;

        if !policy::can_transition(actor.role, event) {
            return Err(ApplicationError::InvalidTransition { from, event });
        }

        if policy::required_role(event) == Role::Applicant
            && application.owner != actor.id.as_str()
        {
            return Err(ApplicationError::InvalidTransition { from, event });
        }

        let mut history = self.store.load_history(id)?;
        let change_date = next_change_date(&history, Utc::now());

        application.status = target;
        if event == TransitionEvent::Submit {
            application.date_submitted = Some(change_date);
        }

        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .or_else(|| default_comment(event));

        history.push(StatusHistoryEntry {
            previous_status: from,
            new_status: target,
            changed_by: actor.id.to_string(),
            change_date,
            comment: comment.clone(),
        });

        let old_application_raw = self.store.read_raw(id, APPLICATION_FILE_NAME)?;
        let old_history_raw = self.store.read_raw(id, HISTORY_FILE_NAME)?;

        let application_yaml =
            serde_yaml::to_string(&application).map_err(ApplicationError::YamlSerialization)?;
        let history_yaml =
            serde_yaml::to_string(&history).map_err(ApplicationError::YamlSerialization)?;

        // Reviewer actions additionally append a review record.
        let review_update = if actor.role == Role::Reviewer {
            let mut reviews = self.store.load_reviews(id)?;
            let old_reviews_raw = self.store.read_raw(id, REVIEWS_FILE_NAME)?;
            reviews.push(ReviewRecord {
                reviewer_id: actor.id.to_string(),
                status: target,
                comment,
                date_assigned: change_date,
                date_reviewed: change_date,
            });
            let reviews_yaml =
                serde_yaml::to_string(&reviews).map_err(ApplicationError::YamlSerialization)?;
            Some((reviews_yaml, old_reviews_raw))
        } else {
            None
        };

        let mut files = vec![
            FileToWrite {
                relative_path: Path::new(APPLICATION_FILE_NAME),
                content: &application_yaml,
                old_content: Some(&old_application_raw),
            },
            FileToWrite {
                relative_path: Path::new(HISTORY_FILE_NAME),
                content: &history_yaml,
                old_content: Some(&old_history_raw),
            },
        ];
        if let Some((reviews_yaml, old_reviews_raw)) = &review_update {
            files.push(FileToWrite {
                relative_path: Path::new(REVIEWS_FILE_NAME),
                content: reviews_yaml,
                old_content: Some(old_reviews_raw),
            });
        }

        let domain = if actor.role == Role::Reviewer {
            CommitDomain::Review
        } else {
            CommitDomain::Status
        };
        let message = CommitMessage::new(
            domain,
            CommitAction::Transition,
            format!("{from} -> {target}"),
        )?
        .with_trailer("Transition-Event", event.as_str())?;

        VersionedFileService::write_and_commit_files(
            &self.store.application_dir(id),
            actor,
            &message,
            &files,
        )?;

        tracing::info!(
            application = %id,
            from = %from,
            to = %target,
            event = %event,
            "application status changed"
        );

        Ok(target)
    }
}

/// The timestamp for the next history entry.
///
/// Strictly greater than the previous entry's timestamp, bumped by 1 ms if
/// the clock has not advanced. Designed to be called inside the
/// per-application lock.
fn next_change_date(history: &[StatusHistoryEntry], now: DateTime<Utc>) -> DateTime<Utc> {
    match history.last() {
        Some(prev) if now <= prev.change_date => prev.change_date + Duration::milliseconds(1),
        _ => now,
    }
}

fn default_comment(event: TransitionEvent) -> Option<String> {
    match event {
        TransitionEvent::Submit => Some("Application submitted for review".to_string()),
        TransitionEvent::Delete => Some("Application deleted by owner".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{CategoryType, InvestigationType};
    use crate::applications::{ApplicationService, NewApplication};
    use crate::constants::{DEFAULT_CODIFICATION_PREFIX, DEFAULT_LOCK_WAIT_MS};
    use cera_types::{EmailAddress, NonEmptyText};
    use std::time::Duration as StdDuration;
    use tempfile::TempDir;

    fn test_cfg(dir: &Path) -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::new(
                dir.to_path_buf(),
                DEFAULT_CODIFICATION_PREFIX.to_string(),
                StdDuration::from_millis(DEFAULT_LOCK_WAIT_MS),
            )
            .expect("CoreConfig::new should succeed"),
        )
    }

    fn actor(id: &str, role: Role) -> Actor {
        Actor {
            id: NonEmptyText::new(id).unwrap(),
            name: NonEmptyText::new("Test User").unwrap(),
            email: EmailAddress::parse("user@example.org").unwrap(),
            role,
        }
    }

    fn create_application(service: &ApplicationService, owner: &str) -> ApplicationUuid {
        service
            .create_application(
                &actor(owner, Role::Applicant),
                NewApplication {
                    project_title: NonEmptyText::new("Water quality survey").unwrap(),
                    investigation_type: InvestigationType::Observational,
                    category_type: CategoryType::HumanSubjects,
                    metadata: serde_json::json!({ "risk": "minimal" }),
                },
            )
            .expect("create_application should succeed")
            .id
    }

    #[test]
    fn submit_moves_draft_to_under_review() {
        let temp_dir = TempDir::new().unwrap();
        let service = ApplicationService::new(test_cfg(temp_dir.path()));
        let id = create_application(&service, "user-1");

        let owner = actor("user-1", Role::Applicant);
        let new_status = service
            .apply_transition(&id, TransitionEvent::Submit, &owner, None)
            .unwrap();

        assert_eq!(new_status, ApplicationStatus::UnderReview);

        let dossier = service.get_application(&owner, &id).unwrap();
        assert_eq!(dossier.application.status, ApplicationStatus::UnderReview);
        assert!(dossier.application.date_submitted.is_some());

        assert_eq!(dossier.history.len(), 2);
        let entry = &dossier.history[1];
        assert_eq!(entry.previous_status, ApplicationStatus::NotSubmitted);
        assert_eq!(entry.new_status, ApplicationStatus::UnderReview);
        assert_eq!(entry.changed_by, "user-1");
        assert_eq!(
            entry.comment.as_deref(),
            Some("Application submitted for review")
        );
    }

    #[test]
    fn approve_is_rejected_from_second_review() {
        let temp_dir = TempDir::new().unwrap();
        let service = ApplicationService::new(test_cfg(temp_dir.path()));
        let id = create_application(&service, "user-1");

        let owner = actor("user-1", Role::Applicant);
        let reviewer = actor("rev-1", Role::Reviewer);

        service
            .apply_transition(&id, TransitionEvent::Submit, &owner, None)
            .unwrap();
        service
            .apply_transition(&id, TransitionEvent::Approve, &reviewer, None)
            .unwrap();

        let err = service
            .apply_transition(&id, TransitionEvent::Approve, &reviewer, None)
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::InvalidTransition {
                from: ApplicationStatus::SecondReview,
                event: TransitionEvent::Approve,
            }
        ));

        let dossier = service.get_application(&reviewer, &id).unwrap();
        assert_eq!(dossier.application.status, ApplicationStatus::SecondReview);
    }

    #[test]
    fn role_mismatch_is_an_invalid_transition() {
        let temp_dir = TempDir::new().unwrap();
        let service = ApplicationService::new(test_cfg(temp_dir.path()));
        let id = create_application(&service, "user-1");

        // A reviewer may not submit on the owner's behalf.
        let err = service
            .apply_transition(
                &id,
                TransitionEvent::Submit,
                &actor("rev-1", Role::Reviewer),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidTransition { .. }));

        // And an applicant may not approve their own application.
        let owner = actor("user-1", Role::Applicant);
        service
            .apply_transition(&id, TransitionEvent::Submit, &owner, None)
            .unwrap();
        let err = service
            .apply_transition(&id, TransitionEvent::Approve, &owner, None)
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidTransition { .. }));
    }

    #[test]
    fn only_the_owner_may_submit_or_delete() {
        let temp_dir = TempDir::new().unwrap();
        let service = ApplicationService::new(test_cfg(temp_dir.path()));
        let id = create_application(&service, "user-1");

        let other = actor("user-2", Role::Applicant);
        let err = service
            .apply_transition(&id, TransitionEvent::Submit, &other, None)
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidTransition { .. }));

        let err = service
            .apply_transition(&id, TransitionEvent::Delete, &other, None)
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidTransition { .. }));
    }

    #[test]
    fn delete_is_a_terminal_soft_delete() {
        let temp_dir = TempDir::new().unwrap();
        let service = ApplicationService::new(test_cfg(temp_dir.path()));
        let id = create_application(&service, "user-1");

        let owner = actor("user-1", Role::Applicant);
        let new_status = service
            .apply_transition(&id, TransitionEvent::Delete, &owner, None)
            .unwrap();
        assert_eq!(new_status, ApplicationStatus::Deleted);

        // The record and its history remain queryable.
        let dossier = service.get_application(&owner, &id).unwrap();
        assert_eq!(dossier.application.status, ApplicationStatus::Deleted);
        assert_eq!(dossier.history.len(), 2);
        assert_eq!(
            dossier.history[1].comment.as_deref(),
            Some("Application deleted by owner")
        );

        // No further transition is permitted.
        let err = service
            .apply_transition(&id, TransitionEvent::Submit, &owner, None)
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidTransition { .. }));
    }

    #[test]
    fn reviewer_actions_append_review_records_manager_actions_do_not() {
        let temp_dir = TempDir::new().unwrap();
        let service = ApplicationService::new(test_cfg(temp_dir.path()));
        let id = create_application(&service, "user-1");

        let owner = actor("user-1", Role::Applicant);
        let reviewer = actor("rev-1", Role::Reviewer);
        let manager = actor("mgr-1", Role::Manager);

        service
            .apply_transition(&id, TransitionEvent::Submit, &owner, None)
            .unwrap();
        service
            .apply_transition(
                &id,
                TransitionEvent::Approve,
                &reviewer,
                Some("Methodology is sound".into()),
            )
            .unwrap();
        service
            .apply_transition(&id, TransitionEvent::FinalApprove, &manager, None)
            .unwrap();

        let dossier = service.get_application(&manager, &id).unwrap();
        assert_eq!(dossier.application.status, ApplicationStatus::Accepted);
        assert_eq!(dossier.reviews.len(), 1);

        let review = &dossier.reviews[0];
        assert_eq!(review.reviewer_id, "rev-1");
        assert_eq!(review.status, ApplicationStatus::SecondReview);
        assert_eq!(review.comment.as_deref(), Some("Methodology is sound"));
        assert_eq!(review.date_assigned, review.date_reviewed);
    }

    #[test]
    fn history_chain_is_contiguous_across_a_full_lifecycle() {
        let temp_dir = TempDir::new().unwrap();
        let service = ApplicationService::new(test_cfg(temp_dir.path()));
        let id = create_application(&service, "user-1");

        let owner = actor("user-1", Role::Applicant);
        let reviewer = actor("rev-1", Role::Reviewer);
        let manager = actor("mgr-1", Role::Manager);

        service
            .apply_transition(&id, TransitionEvent::Submit, &owner, None)
            .unwrap();
        service
            .apply_transition(
                &id,
                TransitionEvent::MarkIncomplete,
                &reviewer,
                Some("Consent form missing".into()),
            )
            .unwrap();
        service
            .apply_transition(&id, TransitionEvent::Submit, &owner, None)
            .unwrap();
        service
            .apply_transition(&id, TransitionEvent::Approve, &reviewer, None)
            .unwrap();
        service
            .apply_transition(&id, TransitionEvent::FinalApprove, &manager, None)
            .unwrap();

        let dossier = service.get_application(&manager, &id).unwrap();
        assert_eq!(dossier.application.status, ApplicationStatus::Accepted);

        // One entry per successful transition plus the creation entry.
        assert_eq!(dossier.history.len(), 6);

        // Each entry's previous status equals the prior entry's new status,
        // and timestamps strictly increase.
        for pair in dossier.history.windows(2) {
            assert_eq!(pair[1].previous_status, pair[0].new_status);
            assert!(pair[1].change_date > pair[0].change_date);
        }
    }

    #[test]
    fn resubmission_refreshes_date_submitted() {
        let temp_dir = TempDir::new().unwrap();
        let service = ApplicationService::new(test_cfg(temp_dir.path()));
        let id = create_application(&service, "user-1");

        let owner = actor("user-1", Role::Applicant);
        let reviewer = actor("rev-1", Role::Reviewer);

        service
            .apply_transition(&id, TransitionEvent::Submit, &owner, None)
            .unwrap();
        let first = service
            .get_application(&owner, &id)
            .unwrap()
            .application
            .date_submitted
            .unwrap();

        service
            .apply_transition(&id, TransitionEvent::MarkIncomplete, &reviewer, None)
            .unwrap();
        service
            .apply_transition(&id, TransitionEvent::Submit, &owner, None)
            .unwrap();
        let second = service
            .get_application(&owner, &id)
            .unwrap()
            .application
            .date_submitted
            .unwrap();

        assert!(second > first);
    }

    #[test]
    fn unknown_application_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let service = ApplicationService::new(test_cfg(temp_dir.path()));

        let err = service
            .apply_transition(
                &ApplicationUuid::new(),
                TransitionEvent::Submit,
                &actor("user-1", Role::Applicant),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound(_)));
    }

    #[test]
    fn failed_commit_leaves_status_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let service = ApplicationService::new(test_cfg(temp_dir.path()));
        let id = create_application(&service, "user-1");

        let owner = actor("user-1", Role::Applicant);

        crate::versioned_files::force_commit_error_for_current_thread();
        let err = service
            .apply_transition(&id, TransitionEvent::Submit, &owner, None)
            .unwrap_err();
        assert!(matches!(err, ApplicationError::GitCommit(_)));

        let dossier = service.get_application(&owner, &id).unwrap();
        assert_eq!(dossier.application.status, ApplicationStatus::NotSubmitted);
        assert_eq!(dossier.application.date_submitted, None);
        assert_eq!(dossier.history.len(), 1);
    }

    #[test]
    fn concurrent_approvals_serialize_to_one_winner() {
        let temp_dir = TempDir::new().unwrap();
        let service = Arc::new(ApplicationService::new(test_cfg(temp_dir.path())));
        let id = create_application(&service, "user-1");

        service
            .apply_transition(
                &id,
                TransitionEvent::Submit,
                &actor("user-1", Role::Applicant),
                None,
            )
            .unwrap();

        let barrier = Arc::new(std::sync::Barrier::new(2));
        let mut handles = Vec::new();
        for reviewer_id in ["rev-1", "rev-2"] {
            let service = Arc::clone(&service);
            let id = id.clone();
            let barrier = Arc::clone(&barrier);
            let reviewer = actor(reviewer_id, Role::Reviewer);
            handles.push(std::thread::spawn(move || {
                barrier.wait();
                service.apply_transition(&id, TransitionEvent::Approve, &reviewer, None)
            }));
        }

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one approval must win");

        let loser = results
            .iter()
            .find(|r| r.is_err())
            .unwrap()
            .as_ref()
            .unwrap_err();
        assert!(matches!(
            loser,
            ApplicationError::InvalidTransition { .. } | ApplicationError::Contention
        ));

        let dossier = service
            .get_application(&actor("rev-1", Role::Reviewer), &id)
            .unwrap();
        assert_eq!(dossier.application.status, ApplicationStatus::SecondReview);
        // Creation, submit, and exactly one approval.
        assert_eq!(dossier.history.len(), 3);
        assert_eq!(dossier.reviews.len(), 1);
    }

    #[test]
    fn next_change_date_bumps_a_stalled_clock() {
        let now = Utc::now();
        let history = vec![StatusHistoryEntry {
            previous_status: ApplicationStatus::NotSubmitted,
            new_status: ApplicationStatus::NotSubmitted,
            changed_by: "user-1".into(),
            change_date: now,
            comment: None,
        }];

        let next = next_change_date(&history, now);
        assert_eq!(next, now + Duration::milliseconds(1));

        let later = now + Duration::seconds(5);
        assert_eq!(next_change_date(&history, later), later);
    }
}

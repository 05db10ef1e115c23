//! Role-based access policy for the workflow engine.
//!
//! A single table answers "may role R perform transition T on an
//! application currently in state S". The workflow engine consults it
//! before any mutation; the API layer consults [`can_view`] and the role
//! helpers for its read endpoints. Keeping the table in one place avoids
//! the drift that comes from re-implementing role checks per handler.
//!
//! Everything here is pure and does no I/O. Ownership of owner-gated
//! events (`submit`, `delete`) additionally requires the acting id to
//! equal the application's owner; that comparison needs the loaded record
//! and therefore lives with the engine, which calls these predicates
//! while holding the application lock.

use crate::application::{Application, ApplicationStatus, Role, TransitionEvent};

/// The target state of `event` from `status`, or `None` when the pair is
/// not an edge of the workflow state machine.
///
/// | From          | Event           | To            |
/// |---------------|-----------------|---------------|
/// | NOT_SUBMITTED | submit          | UNDER_REVIEW  |
/// | NOT_COMPLETED | submit          | UNDER_REVIEW  |
/// | NOT_SUBMITTED | delete          | DELETED       |
/// | NOT_COMPLETED | delete          | DELETED       |
/// | UNDER_REVIEW  | approve         | SECOND_REVIEW |
/// | UNDER_REVIEW  | reject          | REJECTED      |
/// | UNDER_REVIEW  | mark_incomplete | NOT_COMPLETED |
/// | SECOND_REVIEW | final_approve   | ACCEPTED      |
/// | SECOND_REVIEW | final_reject    | REJECTED      |
pub fn transition_target(
    status: ApplicationStatus,
    event: TransitionEvent,
) -> Option<ApplicationStatus> {
    use ApplicationStatus::*;
    use TransitionEvent::*;

    match (status, event) {
        (NotSubmitted, Submit) | (NotCompleted, Submit) => Some(UnderReview),
        (NotSubmitted, Delete) | (NotCompleted, Delete) => Some(Deleted),
        (UnderReview, Approve) => Some(SecondReview),
        (UnderReview, Reject) => Some(Rejected),
        (UnderReview, MarkIncomplete) => Some(NotCompleted),
        (SecondReview, FinalApprove) => Some(Accepted),
        (SecondReview, FinalReject) => Some(Rejected),
        _ => None,
    }
}

/// The role required to trigger `event`.
pub const fn required_role(event: TransitionEvent) -> Role {
    use TransitionEvent::*;

    match event {
        Submit | Delete => Role::Applicant,
        Approve | Reject | MarkIncomplete => Role::Reviewer,
        FinalApprove | FinalReject => Role::Manager,
    }
}

/// Whether `role` may trigger `event` at all.
///
/// For owner-gated events the engine additionally checks that the acting
/// id equals the application's owner.
pub fn can_transition(role: Role, event: TransitionEvent) -> bool {
    role == required_role(event)
}

/// Whether the actor may read the application, its history and reviews.
///
/// The owner, any reviewer, and any manager may view; all others are
/// denied.
pub fn can_view(role: Role, actor_id: &str, application: &Application) -> bool {
    match role {
        Role::Reviewer | Role::Manager => true,
        Role::Applicant => application.owner == actor_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cera_types::NonEmptyText;
    use cera_uuid::ApplicationUuid;
    use chrono::Utc;

    fn application_owned_by(owner: &str) -> Application {
        Application {
            id: ApplicationUuid::new(),
            owner: owner.to_string(),
            project_title: NonEmptyText::new("Microplastic exposure study").unwrap(),
            investigation_type: crate::application::InvestigationType::Observational,
            category_type: crate::application::CategoryType::HumanSubjects,
            sequential_number: 1,
            codification: "CEISH-ESPOL-23-05-EO-SH-001-abc123".into(),
            status: ApplicationStatus::NotSubmitted,
            date_created: Utc::now(),
            date_submitted: None,
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn every_edge_of_the_table_is_present() {
        use ApplicationStatus::*;
        use TransitionEvent::*;

        assert_eq!(transition_target(NotSubmitted, Submit), Some(UnderReview));
        assert_eq!(transition_target(NotCompleted, Submit), Some(UnderReview));
        assert_eq!(transition_target(NotSubmitted, Delete), Some(Deleted));
        assert_eq!(transition_target(NotCompleted, Delete), Some(Deleted));
        assert_eq!(transition_target(UnderReview, Approve), Some(SecondReview));
        assert_eq!(transition_target(UnderReview, Reject), Some(Rejected));
        assert_eq!(
            transition_target(UnderReview, MarkIncomplete),
            Some(NotCompleted)
        );
        assert_eq!(transition_target(SecondReview, FinalApprove), Some(Accepted));
        assert_eq!(transition_target(SecondReview, FinalReject), Some(Rejected));
    }

    #[test]
    fn approve_is_not_valid_from_second_review() {
        assert_eq!(
            transition_target(ApplicationStatus::SecondReview, TransitionEvent::Approve),
            None
        );
    }

    #[test]
    fn terminal_states_admit_no_events() {
        use TransitionEvent::*;

        for status in [
            ApplicationStatus::Accepted,
            ApplicationStatus::Rejected,
            ApplicationStatus::Deleted,
        ] {
            for event in [
                Submit,
                Delete,
                Approve,
                Reject,
                MarkIncomplete,
                FinalApprove,
                FinalReject,
            ] {
                assert_eq!(
                    transition_target(status, event),
                    None,
                    "{status} should not accept {event}"
                );
            }
        }
    }

    #[test]
    fn roles_gate_their_own_events() {
        use TransitionEvent::*;

        assert!(can_transition(Role::Applicant, Submit));
        assert!(can_transition(Role::Applicant, Delete));
        assert!(!can_transition(Role::Applicant, Approve));

        assert!(can_transition(Role::Reviewer, Approve));
        assert!(can_transition(Role::Reviewer, Reject));
        assert!(can_transition(Role::Reviewer, MarkIncomplete));
        assert!(!can_transition(Role::Reviewer, Submit));
        assert!(!can_transition(Role::Reviewer, FinalApprove));

        assert!(can_transition(Role::Manager, FinalApprove));
        assert!(can_transition(Role::Manager, FinalReject));
        assert!(!can_transition(Role::Manager, Approve));
    }

    #[test]
    fn owner_and_committee_roles_may_view() {
        let application = application_owned_by("user-1");

        assert!(can_view(Role::Applicant, "user-1", &application));
        assert!(can_view(Role::Reviewer, "someone-else", &application));
        assert!(can_view(Role::Manager, "someone-else", &application));
        assert!(!can_view(Role::Applicant, "user-2", &application));
    }
}

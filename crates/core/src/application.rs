//! Domain model for ethics applications.
//!
//! The types here mirror the persisted YAML documents: one
//! [`Application`] record, its append-only [`StatusHistoryEntry`] list and
//! its append-only [`ReviewRecord`] list live together in the
//! application's sharded directory. Wire and storage forms use the
//! committee's established two-letter classification codes and
//! SCREAMING_SNAKE status values.

use crate::error::{ApplicationError, ApplicationResult};
use cera_types::NonEmptyText;
use cera_uuid::ApplicationUuid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of an application.
///
/// Transitions between states are governed exclusively by the workflow
/// engine; no other writer may set the status field. `Accepted`,
/// `Rejected` and `Deleted` are terminal. Deletion is soft: the record
/// and its history remain readable forever.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    NotSubmitted,
    UnderReview,
    SecondReview,
    NotCompleted,
    Accepted,
    Rejected,
    Deleted,
}

impl ApplicationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotSubmitted => "NOT_SUBMITTED",
            Self::UnderReview => "UNDER_REVIEW",
            Self::SecondReview => "SECOND_REVIEW",
            Self::NotCompleted => "NOT_COMPLETED",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Deleted => "DELETED",
        }
    }

    /// Returns true if no further transition is permitted from this state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected | Self::Deleted)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named action that moves an application from one status to another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionEvent {
    Submit,
    Delete,
    Approve,
    Reject,
    MarkIncomplete,
    FinalApprove,
    FinalReject,
}

impl TransitionEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Delete => "delete",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::MarkIncomplete => "mark_incomplete",
            Self::FinalApprove => "final_approve",
            Self::FinalReject => "final_reject",
        }
    }
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransitionEvent {
    type Err = ApplicationError;

    fn from_str(s: &str) -> ApplicationResult<Self> {
        match s {
            "submit" => Ok(Self::Submit),
            "delete" => Ok(Self::Delete),
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "mark_incomplete" => Ok(Self::MarkIncomplete),
            "final_approve" => Ok(Self::FinalApprove),
            "final_reject" => Ok(Self::FinalReject),
            other => Err(ApplicationError::InvalidEvent(other.to_string())),
        }
    }
}

/// Investigation classification declared at creation. Immutable thereafter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvestigationType {
    /// Interventional study (`EI`).
    #[serde(rename = "EI")]
    Intervention,
    /// Observational study (`EO`).
    #[serde(rename = "EO")]
    Observational,
}

impl InvestigationType {
    /// The two-letter code rendered into codifications and stored records.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Intervention => "EI",
            Self::Observational => "EO",
        }
    }
}

impl fmt::Display for InvestigationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for InvestigationType {
    type Err = ApplicationError;

    fn from_str(s: &str) -> ApplicationResult<Self> {
        match s {
            "EI" => Ok(Self::Intervention),
            "EO" => Ok(Self::Observational),
            other => Err(ApplicationError::InvalidInvestigationType(
                other.to_string(),
            )),
        }
    }
}

/// Research category declared at creation. Immutable thereafter.
///
/// An unknown category code fails with
/// [`ApplicationError::InvalidCategory`] at the parsing boundary, before
/// any identifier is generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryType {
    /// General research (`GE`).
    #[serde(rename = "GE")]
    General,
    /// Research involving human subjects (`SH`).
    #[serde(rename = "SH")]
    HumanSubjects,
    /// Research involving animals and living things (`AN`).
    #[serde(rename = "AN")]
    AnimalsAndLivingThings,
}

impl CategoryType {
    /// The two-letter code rendered into codifications and stored records.
    pub const fn code(self) -> &'static str {
        match self {
            Self::General => "GE",
            Self::HumanSubjects => "SH",
            Self::AnimalsAndLivingThings => "AN",
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CategoryType {
    type Err = ApplicationError;

    fn from_str(s: &str) -> ApplicationResult<Self> {
        match s {
            "GE" => Ok(Self::General),
            "SH" => Ok(Self::HumanSubjects),
            "AN" => Ok(Self::AnimalsAndLivingThings),
            other => Err(ApplicationError::InvalidCategory(other.to_string())),
        }
    }
}

/// The role an actor holds when calling into the workflow engine.
///
/// Role resolution is the job of the surrounding auth collaborator; the
/// core only consumes the resolved value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Applicant,
    Reviewer,
    Manager,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applicant => "applicant",
            Self::Reviewer => "reviewer",
            Self::Manager => "manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ApplicationError;

    fn from_str(s: &str) -> ApplicationResult<Self> {
        match s {
            "applicant" => Ok(Self::Applicant),
            "reviewer" => Ok(Self::Reviewer),
            "manager" => Ok(Self::Manager),
            other => Err(ApplicationError::InvalidInput(format!(
                "unknown role: {other}"
            ))),
        }
    }
}

/// An ethics application record.
///
/// Stored as `application.yaml` in the application's sharded directory.
/// All fields except `status` and `date_submitted` are immutable after
/// creation, and those two change only through the workflow engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationUuid,
    /// Identifier of the submitting applicant. Immutable.
    pub owner: String,
    pub project_title: NonEmptyText,
    pub investigation_type: InvestigationType,
    pub category_type: CategoryType,
    /// Strictly increasing across every application ever created; never
    /// reused, even for deleted applications.
    pub sequential_number: u64,
    /// Human-readable unique identifier assigned at creation.
    pub codification: String,
    pub status: ApplicationStatus,
    pub date_created: DateTime<Utc>,
    /// Set by the submit edge; refreshed on resubmission, never cleared.
    pub date_submitted: Option<DateTime<Utc>>,
    /// Opaque applicant-supplied and denormalised-user attributes captured
    /// at creation. Never validated or mutated by the workflow engine.
    pub metadata: serde_json::Value,
}

/// Immutable audit record of one status change.
///
/// The creation event is recorded too, with
/// `previous_status == new_status == NOT_SUBMITTED`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub previous_status: ApplicationStatus,
    pub new_status: ApplicationStatus,
    /// Identifier of the actor that triggered the change.
    pub changed_by: String,
    pub change_date: DateTime<Utc>,
    pub comment: Option<String>,
}

/// Record of a reviewer action, created only when a reviewer (not a
/// manager) performs a transition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub reviewer_id: String,
    /// The status the application entered as a result of this review.
    pub status: ApplicationStatus,
    pub comment: Option<String>,
    pub date_assigned: DateTime<Utc>,
    pub date_reviewed: DateTime<Utc>,
}

//! Request and response types exchanged over the API boundary.
//!
//! These are deliberately stringly-typed where the core uses enums: the
//! conversion boundary is where unknown classification codes, event names
//! and roles are rejected with their dedicated errors. Dates travel as
//! RFC 3339 strings.

use cera_core::{
    Application, ApplicationDossier, CreatedApplication, ReviewRecord, StatusHistoryEntry,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /applications`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateApplicationReq {
    pub project_title: String,
    /// `EI` (intervention) or `EO` (observational).
    pub investigation_type: String,
    /// `GE`, `SH` or `AN`.
    pub category_type: String,
    /// Opaque applicant-supplied attributes, stored as provided.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
}

/// Response of `POST /applications`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateApplicationRes {
    pub id: String,
    pub codification: String,
    pub sequential_number: u64,
}

impl From<CreatedApplication> for CreateApplicationRes {
    fn from(created: CreatedApplication) -> Self {
        Self {
            id: created.id.to_string(),
            codification: created.codification,
            sequential_number: created.sequential_number,
        }
    }
}

/// Body of `PUT /applications/{id}/status`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionReq {
    /// One of `approve`, `reject`, `mark_incomplete`, `final_approve`,
    /// `final_reject` (owner events use their dedicated routes).
    pub event: String,
    pub comment: Option<String>,
}

/// Response of any transition endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionRes {
    pub new_status: String,
}

/// An application record as exposed over the API.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplicationRes {
    pub id: String,
    pub owner: String,
    pub project_title: String,
    pub investigation_type: String,
    pub category_type: String,
    pub sequential_number: u64,
    pub codification: String,
    pub status: String,
    pub date_created: String,
    pub date_submitted: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
}

impl From<Application> for ApplicationRes {
    fn from(application: Application) -> Self {
        Self {
            id: application.id.to_string(),
            owner: application.owner,
            project_title: application.project_title.to_string(),
            investigation_type: application.investigation_type.code().to_string(),
            category_type: application.category_type.code().to_string(),
            sequential_number: application.sequential_number,
            codification: application.codification,
            status: application.status.as_str().to_string(),
            date_created: application.date_created.to_rfc3339(),
            date_submitted: application.date_submitted.map(|d| d.to_rfc3339()),
            metadata: application.metadata,
        }
    }
}

/// One audit entry of an application's status history.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusHistoryEntryRes {
    pub previous_status: String,
    pub new_status: String,
    pub changed_by: String,
    pub change_date: String,
    pub comment: Option<String>,
}

impl From<StatusHistoryEntry> for StatusHistoryEntryRes {
    fn from(entry: StatusHistoryEntry) -> Self {
        Self {
            previous_status: entry.previous_status.as_str().to_string(),
            new_status: entry.new_status.as_str().to_string(),
            changed_by: entry.changed_by,
            change_date: entry.change_date.to_rfc3339(),
            comment: entry.comment,
        }
    }
}

/// One reviewer record.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewRes {
    pub reviewer_id: String,
    pub status: String,
    pub comment: Option<String>,
    pub date_assigned: String,
    pub date_reviewed: String,
}

impl From<ReviewRecord> for ReviewRes {
    fn from(review: ReviewRecord) -> Self {
        Self {
            reviewer_id: review.reviewer_id,
            status: review.status.as_str().to_string(),
            comment: review.comment,
            date_assigned: review.date_assigned.to_rfc3339(),
            date_reviewed: review.date_reviewed.to_rfc3339(),
        }
    }
}

/// Response of `GET /applications/{id}`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GetApplicationRes {
    pub application: ApplicationRes,
    pub history: Vec<StatusHistoryEntryRes>,
    pub reviews: Vec<ReviewRes>,
}

impl From<ApplicationDossier> for GetApplicationRes {
    fn from(dossier: ApplicationDossier) -> Self {
        Self {
            application: dossier.application.into(),
            history: dossier.history.into_iter().map(Into::into).collect(),
            reviews: dossier.reviews.into_iter().map(Into::into).collect(),
        }
    }
}

/// Response of the listing endpoints.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListApplicationsRes {
    pub applications: Vec<ApplicationRes>,
}

/// An application awaiting a final decision, with the review that sent it
/// there.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DecisionItemRes {
    pub application: ApplicationRes,
    pub latest_review: Option<ReviewRes>,
}

/// Response of `GET /applications/manage`.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ListDecisionsRes {
    pub applications: Vec<DecisionItemRes>,
}

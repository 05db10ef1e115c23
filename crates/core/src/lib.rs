//! # CERA Core
//!
//! Core business logic for the CERA ethics-application tracking system.
//!
//! This crate contains the workflow engine and pure data operations:
//! - Application creation with race-free codification and sequential-number
//!   assignment
//! - The status workflow state machine with role-gated transitions
//! - Append-only status history and review records, one git commit per change
//! - Role-based access policy
//!
//! **No API concerns**: authentication, HTTP servers, or service interfaces
//! belong in `api-rest` and `api-shared`.

pub mod applications;
pub mod codification;
pub mod config;
pub mod constants;
pub mod error;
pub mod locks;
pub mod policy;
pub mod store;
pub mod workflow;

mod actor;
mod application;
pub(crate) mod versioned_files;

pub use actor::Actor;
pub use application::{
    Application, ApplicationStatus, CategoryType, InvestigationType, ReviewRecord, Role,
    StatusHistoryEntry, TransitionEvent,
};
pub use applications::{
    ApplicationDossier, ApplicationService, CreatedApplication, NewApplication,
};
pub use cera_types::{EmailAddress, NonEmptyText, TextError};
pub use cera_uuid::ApplicationUuid;
pub use codification::{CodificationGenerator, GeneratedCodification};
pub use config::CoreConfig;
pub use constants::{DEFAULT_APPLICATION_DATA_DIR, DEFAULT_CODIFICATION_PREFIX};
pub use error::{ApplicationError, ApplicationResult};
pub use locks::LockRegistry;
pub use store::ApplicationStore;
pub use workflow::WorkflowEngine;

//! Application lifecycle service.
//!
//! [`ApplicationService`] is the facade the API and CLI layers call:
//! creation with race-free identifier assignment, transition delegation to
//! the workflow engine, and the read operations the dashboards need. It
//! owns the [`LockRegistry`] so every entry point of a process serialises
//! on the same critical sections.

use crate::actor::Actor;
use crate::application::{
    Application, ApplicationStatus, CategoryType, InvestigationType, ReviewRecord,
    StatusHistoryEntry, TransitionEvent,
};
use crate::codification::CodificationGenerator;
use crate::config::CoreConfig;
use crate::constants::{
    APPLICATION_FILE_NAME, DEFAULT_GITIGNORE, HISTORY_FILE_NAME, REVIEWS_FILE_NAME,
};
use crate::error::{ApplicationError, ApplicationResult};
use crate::locks::LockRegistry;
use crate::policy;
use crate::store::ApplicationStore;
use crate::versioned_files::{
    CommitAction, CommitDomain, CommitMessage, FileToWrite, VersionedFileService,
};
use crate::workflow::WorkflowEngine;
use cera_types::NonEmptyText;
use cera_uuid::ApplicationUuid;
use chrono::Utc;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Applicant-supplied input for a new application.
#[derive(Clone, Debug)]
pub struct NewApplication {
    pub project_title: NonEmptyText,
    pub investigation_type: InvestigationType,
    pub category_type: CategoryType,
    /// Opaque attribute bag captured as-is; the engine never inspects it.
    pub metadata: serde_json::Value,
}

/// The identifiers assigned to a freshly created application.
#[derive(Clone, Debug)]
pub struct CreatedApplication {
    pub id: ApplicationUuid,
    pub codification: String,
    pub sequential_number: u64,
}

/// An application together with its complete audit records.
#[derive(Clone, Debug)]
pub struct ApplicationDossier {
    pub application: Application,
    pub history: Vec<StatusHistoryEntry>,
    pub reviews: Vec<ReviewRecord>,
}

/// Facade over creation, transitions and reads.
#[derive(Clone)]
pub struct ApplicationService {
    cfg: Arc<CoreConfig>,
    store: ApplicationStore,
    generator: CodificationGenerator,
    engine: WorkflowEngine,
    locks: Arc<LockRegistry>,
}

impl ApplicationService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        let locks = Arc::new(LockRegistry::new());
        Self {
            store: ApplicationStore::new(cfg.clone()),
            generator: CodificationGenerator::new(cfg.clone()),
            engine: WorkflowEngine::new(cfg.clone(), Arc::clone(&locks)),
            cfg,
            locks,
        }
    }

    /// Create a new application owned by `actor`.
    ///
    /// Runs as a single critical section under the global creation lock:
    /// read the sequence registry, compute the next sequential number and
    /// codification, verify uniqueness, persist the updated registry, and
    /// initialise the application directory with its first audit commit
    /// (record, creation history entry, empty review list). If record
    /// creation fails, the registry is restored to its previous content so
    /// the reservation is not leaked.
    ///
    /// # Errors
    ///
    /// - [`ApplicationError::Contention`] if the creation lock cannot be
    ///   acquired within the configured wait (retryable).
    /// - [`ApplicationError::CollisionDetected`] if the generated
    ///   codification already exists (retryable).
    /// - A persistence error if the registry or the application directory
    ///   cannot be written.
    pub fn create_application(
        &self,
        actor: &Actor,
        new_application: NewApplication,
    ) -> ApplicationResult<CreatedApplication> {
        let creation = self.locks.creation_lock();
        let _guard = creation
            .try_lock_for(self.cfg.lock_wait())
            .ok_or(ApplicationError::Contention)?;

        let now = Utc::now();

        let mut registry = self.generator.load_registry()?;
        let old_registry_raw = self.generator.read_registry_raw()?;
        let generated = self.generator.candidate(
            &registry,
            new_application.investigation_type,
            new_application.category_type,
            now,
        )?;
        registry.note_issue(&generated);

        let (id, application_dir) = self.allocate_application_dir()?;

        let application = Application {
            id: id.clone(),
            owner: actor.id.to_string(),
            project_title: new_application.project_title,
            investigation_type: new_application.investigation_type,
            category_type: new_application.category_type,
            sequential_number: generated.sequential_number,
            codification: generated.codification.clone(),
            status: ApplicationStatus::NotSubmitted,
            date_created: now,
            date_submitted: None,
            metadata: new_application.metadata,
        };

        let history = vec![StatusHistoryEntry {
            previous_status: ApplicationStatus::NotSubmitted,
            new_status: ApplicationStatus::NotSubmitted,
            changed_by: actor.id.to_string(),
            change_date: now,
            comment: Some("Application created".to_string()),
        }];
        let reviews: Vec<ReviewRecord> = Vec::new();

        let application_yaml =
            serde_yaml::to_string(&application).map_err(ApplicationError::YamlSerialization)?;
        let history_yaml =
            serde_yaml::to_string(&history).map_err(ApplicationError::YamlSerialization)?;
        let reviews_yaml =
            serde_yaml::to_string(&reviews).map_err(ApplicationError::YamlSerialization)?;

        let files = [
            FileToWrite {
                relative_path: Path::new(".gitignore"),
                content: DEFAULT_GITIGNORE,
                old_content: None,
            },
            FileToWrite {
                relative_path: Path::new(APPLICATION_FILE_NAME),
                content: &application_yaml,
                old_content: None,
            },
            FileToWrite {
                relative_path: Path::new(HISTORY_FILE_NAME),
                content: &history_yaml,
                old_content: None,
            },
            FileToWrite {
                relative_path: Path::new(REVIEWS_FILE_NAME),
                content: &reviews_yaml,
                old_content: None,
            },
        ];

        let message = CommitMessage::new(
            CommitDomain::Application,
            CommitAction::Create,
            "Application record created",
        )?
        .with_trailer("Codification", generated.codification.as_str())?;

        if let Err(store_error) = self.generator.store_registry(&registry) {
            self.generator
                .restore_registry_raw(old_registry_raw.as_deref());
            return Err(store_error);
        }

        if let Err(create_error) =
            VersionedFileService::init_and_commit(&application_dir, actor, &message, &files)
        {
            self.generator
                .restore_registry_raw(old_registry_raw.as_deref());
            return Err(create_error);
        }

        tracing::info!(
            application = %id,
            codification = %generated.codification,
            sequential_number = generated.sequential_number,
            "application created"
        );

        Ok(CreatedApplication {
            id,
            codification: generated.codification,
            sequential_number: generated.sequential_number,
        })
    }

    /// Apply a workflow event. See [`WorkflowEngine::apply_transition`].
    pub fn apply_transition(
        &self,
        id: &ApplicationUuid,
        event: TransitionEvent,
        actor: &Actor,
        comment: Option<String>,
    ) -> ApplicationResult<ApplicationStatus> {
        self.engine.apply_transition(id, event, actor, comment)
    }

    /// Load an application with its full history and reviews.
    ///
    /// View access follows [`policy::can_view`]: the owner, reviewers and
    /// managers. Actors without view access receive `NotFound`; whether the
    /// id exists is not revealed to them.
    ///
    /// The read holds the application lock, so a dossier never interleaves
    /// with a transition: the record, history and reviews always belong to
    /// the same committed state.
    pub fn get_application(
        &self,
        actor: &Actor,
        id: &ApplicationUuid,
    ) -> ApplicationResult<ApplicationDossier> {
        let lock = self.locks.application_lock(id);
        let _guard = lock
            .try_lock_for(self.cfg.lock_wait())
            .ok_or(ApplicationError::Contention)?;

        let application = self.store.load_application(id)?;
        if !policy::can_view(actor.role, actor.id.as_str(), &application) {
            return Err(ApplicationError::NotFound(id.to_string()));
        }

        let history = self.store.load_history(id)?;
        let reviews = self.store.load_reviews(id)?;

        Ok(ApplicationDossier {
            application,
            history,
            reviews,
        })
    }

    /// The owner's applications, newest first, deleted ones excluded.
    pub fn list_for_owner(&self, owner: &str) -> Vec<Application> {
        self.store.list_for_owner(owner)
    }

    /// All applications awaiting first review.
    pub fn list_under_review(&self) -> Vec<Application> {
        self.store.list_with_status(ApplicationStatus::UnderReview)
    }

    /// All applications awaiting a final decision, each with the most
    /// recent review that sent it there.
    pub fn list_for_decision(&self) -> Vec<(Application, Option<ReviewRecord>)> {
        self.store
            .list_with_status(ApplicationStatus::SecondReview)
            .into_iter()
            .map(|application| {
                let review = self
                    .store
                    .latest_review(&application.id)
                    .unwrap_or_else(|e| {
                        tracing::warn!(
                            application = %application.id,
                            "failed to load reviews for decision listing: {e}"
                        );
                        None
                    });
                (application, review)
            })
            .collect()
    }

    /// Allocate a fresh identifier and its (not yet created) sharded
    /// directory, guarding against pathological id collisions or
    /// pre-existing directories by retrying with different ids.
    fn allocate_application_dir(&self) -> ApplicationResult<(ApplicationUuid, PathBuf)> {
        let base_dir = self.cfg.applications_dir();

        for _attempt in 0..5 {
            let id = ApplicationUuid::new();
            let candidate = id.sharded_dir(&base_dir);

            if candidate.exists() {
                continue;
            }

            if let Some(parent) = candidate.parent() {
                fs::create_dir_all(parent).map_err(ApplicationError::ApplicationDirCreation)?;
            }

            return Ok((id, candidate));
        }

        Err(ApplicationError::ApplicationDirCreation(io::Error::new(
            ErrorKind::AlreadyExists,
            "failed to allocate a unique application directory after 5 attempts",
        )))
    }
}

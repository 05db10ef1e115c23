//! Application record store.
//!
//! Applications live in a sharded directory structure:
//!
//! ```text
//! <application_data_dir>/applications/<s1>/<s2>/<uuid>/
//!   application.yaml   # the record
//!   history.yaml       # append-only status history
//!   reviews.yaml       # append-only reviewer records
//!   .git/              # one audit commit per change
//! ```
//!
//! where `s1`/`s2` are the first four hex characters of the application id.
//!
//! The store is the read path plus raw-content helpers for the write path;
//! all mutation goes through the workflow engine and application service so
//! that locking and atomic commits are never bypassed. Listing operations
//! traverse the shard tree and skip unreadable entries with a warning, the
//! same posture the rest of the system takes towards damaged directories:
//! one corrupt record must not take down a dashboard.

use crate::application::{Application, ApplicationStatus, ReviewRecord, StatusHistoryEntry};
use crate::config::CoreConfig;
use crate::constants::{APPLICATION_FILE_NAME, HISTORY_FILE_NAME, REVIEWS_FILE_NAME};
use crate::error::{ApplicationError, ApplicationResult};
use cera_uuid::ApplicationUuid;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Read access to persisted applications and their audit records.
#[derive(Clone)]
pub struct ApplicationStore {
    cfg: Arc<CoreConfig>,
}

impl ApplicationStore {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// The sharded directory of an application.
    pub fn application_dir(&self, id: &ApplicationUuid) -> PathBuf {
        id.sharded_dir(&self.cfg.applications_dir())
    }

    /// Whether a record exists for `id`.
    pub fn exists(&self, id: &ApplicationUuid) -> bool {
        self.application_dir(id).join(APPLICATION_FILE_NAME).is_file()
    }

    /// Load the application record.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::NotFound`] if no record exists for `id`,
    /// or a persistence error if the record cannot be read or parsed.
    pub fn load_application(&self, id: &ApplicationUuid) -> ApplicationResult<Application> {
        let contents = self.read_raw(id, APPLICATION_FILE_NAME)?;
        serde_yaml::from_str(&contents).map_err(ApplicationError::YamlDeserialization)
    }

    /// Load the full status history of an application, oldest first.
    pub fn load_history(
        &self,
        id: &ApplicationUuid,
    ) -> ApplicationResult<Vec<StatusHistoryEntry>> {
        let contents = self.read_raw(id, HISTORY_FILE_NAME)?;
        serde_yaml::from_str(&contents).map_err(ApplicationError::YamlDeserialization)
    }

    /// Load the review records of an application, oldest first.
    pub fn load_reviews(&self, id: &ApplicationUuid) -> ApplicationResult<Vec<ReviewRecord>> {
        let contents = self.read_raw(id, REVIEWS_FILE_NAME)?;
        serde_yaml::from_str(&contents).map_err(ApplicationError::YamlDeserialization)
    }

    /// Read the raw content of one of the application's files.
    ///
    /// The write path needs the previous content of every file it rewrites
    /// so a failed commit can restore it.
    pub(crate) fn read_raw(
        &self,
        id: &ApplicationUuid,
        file_name: &str,
    ) -> ApplicationResult<String> {
        let path = self.application_dir(id).join(file_name);
        if !path.is_file() {
            return Err(ApplicationError::NotFound(id.to_string()));
        }
        fs::read_to_string(&path).map_err(ApplicationError::FileRead)
    }

    /// Lists all applications belonging to `owner`, newest first.
    ///
    /// Deleted applications are excluded: the records remain on disk and
    /// queryable by id, but they no longer appear in the owner's listing.
    pub fn list_for_owner(&self, owner: &str) -> Vec<Application> {
        let mut applications: Vec<Application> = self
            .walk_applications()
            .into_iter()
            .filter(|a| a.owner == owner && a.status != ApplicationStatus::Deleted)
            .collect();
        applications.sort_by(|a, b| b.date_created.cmp(&a.date_created));
        applications
    }

    /// Lists all applications currently in `status`, most recently
    /// submitted first.
    pub fn list_with_status(&self, status: ApplicationStatus) -> Vec<Application> {
        let mut applications: Vec<Application> = self
            .walk_applications()
            .into_iter()
            .filter(|a| a.status == status)
            .collect();
        applications.sort_by(|a, b| b.date_submitted.cmp(&a.date_submitted));
        applications
    }

    /// The most recent review of an application, if any.
    pub fn latest_review(&self, id: &ApplicationUuid) -> ApplicationResult<Option<ReviewRecord>> {
        let reviews = self.load_reviews(id)?;
        Ok(reviews
            .into_iter()
            .max_by_key(|r| r.date_reviewed))
    }

    /// Traverses the sharded directory structure and parses every
    /// application record found.
    ///
    /// Individual records that cannot be read or parsed are logged as
    /// warnings and skipped.
    fn walk_applications(&self) -> Vec<Application> {
        let applications_dir = self.cfg.applications_dir();

        let mut applications = Vec::new();

        let s1_iter = match fs::read_dir(&applications_dir) {
            Ok(it) => it,
            Err(_) => return applications,
        };
        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }

            let s2_iter = match fs::read_dir(&s1_path) {
                Ok(it) => it,
                Err(_) => continue,
            };

            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }

                let id_iter = match fs::read_dir(&s2_path) {
                    Ok(it) => it,
                    Err(_) => continue,
                };

                for id_ent in id_iter.flatten() {
                    let id_path = id_ent.path();
                    if !id_path.is_dir() {
                        continue;
                    }

                    let record_path = id_path.join(APPLICATION_FILE_NAME);
                    if !record_path.is_file() {
                        continue;
                    }

                    match fs::read_to_string(&record_path) {
                        Ok(contents) => match serde_yaml::from_str::<Application>(&contents) {
                            Ok(application) => applications.push(application),
                            Err(e) => {
                                tracing::warn!(
                                    "failed to parse application record: {} - {}",
                                    record_path.display(),
                                    e
                                );
                            }
                        },
                        Err(e) => {
                            tracing::warn!(
                                "failed to read application record: {} - {}",
                                record_path.display(),
                                e
                            );
                        }
                    }
                }
            }
        }

        applications
    }
}

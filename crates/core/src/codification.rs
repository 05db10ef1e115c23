//! Codification generation for new applications.
//!
//! Every application receives two identifiers beyond its storage id:
//!
//! - a `sequential_number`, strictly increasing over *every* application
//!   ever created (deleted ones included — numbers are never reused), and
//! - a `codification`, the human-readable committee reference:
//!
//! ```text
//! <PREFIX>-<YY>-<MM>-<EI|EO>-<GE|SH|AN>-<NNN>-<suffix>
//! CEISH-ESPOL-23-05-EO-SH-007-4f9a1c
//! ```
//!
//! Both come from the sequence registry (`registry.yaml` at the data-dir
//! root), which records the last issued number and every codification ever
//! issued. The registry is only read and written inside the creation
//! critical section held by the application service, so concurrent
//! creations can never observe the same maximum. A duplicate codification
//! (possible only through suffix collision within one prefix/period/number
//! cell) aborts with `CollisionDetected` rather than overwriting; the
//! caller may retry.
//!
//! Generation itself persists nothing. The application service updates the
//! registry and creates the record inside the same critical section, so an
//! issued number is never lost between generation and use.

use crate::application::{CategoryType, InvestigationType};
use crate::config::CoreConfig;
use crate::constants::CODIFICATION_SUFFIX_LEN;
use crate::error::{ApplicationError, ApplicationResult};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::Arc;

/// A freshly generated identifier pair, not yet bound to a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedCodification {
    pub codification: String,
    pub sequential_number: u64,
}

/// Persistent state of the identifier generator.
///
/// `last_sequential` is the current global maximum over every application
/// ever created. `codifications` is the issue log consulted by the
/// duplicate check.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct SequenceRegistry {
    pub(crate) last_sequential: u64,
    pub(crate) codifications: Vec<String>,
}

impl SequenceRegistry {
    fn contains(&self, codification: &str) -> bool {
        self.codifications.iter().any(|c| c == codification)
    }

    /// Record an issued pair. Called before the registry is stored back.
    pub(crate) fn note_issue(&mut self, generated: &GeneratedCodification) {
        self.last_sequential = generated.sequential_number;
        self.codifications.push(generated.codification.clone());
    }
}

/// Generates unique codifications and sequential numbers.
///
/// All methods that touch the registry expect the caller to hold the
/// creation lock; the generator itself is lock-free so it composes into
/// the service's wider critical section.
#[derive(Clone)]
pub struct CodificationGenerator {
    cfg: Arc<CoreConfig>,
}

impl CodificationGenerator {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Load the sequence registry, defaulting to an empty one when no
    /// application has ever been created.
    pub(crate) fn load_registry(&self) -> ApplicationResult<SequenceRegistry> {
        let path = self.cfg.registry_path();
        if !path.is_file() {
            return Ok(SequenceRegistry::default());
        }
        let contents = fs::read_to_string(&path).map_err(ApplicationError::FileRead)?;
        serde_yaml::from_str(&contents).map_err(ApplicationError::YamlDeserialization)
    }

    /// Raw registry content, for restore-on-failure. `None` when the file
    /// does not exist yet.
    pub(crate) fn read_registry_raw(&self) -> ApplicationResult<Option<String>> {
        let path = self.cfg.registry_path();
        if !path.is_file() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(ApplicationError::FileRead)
    }

    /// Persist the registry.
    pub(crate) fn store_registry(&self, registry: &SequenceRegistry) -> ApplicationResult<()> {
        let yaml =
            serde_yaml::to_string(registry).map_err(ApplicationError::YamlSerialization)?;
        if let Some(parent) = self.cfg.registry_path().parent() {
            fs::create_dir_all(parent).map_err(ApplicationError::StorageDirCreation)?;
        }
        fs::write(self.cfg.registry_path(), yaml).map_err(ApplicationError::FileWrite)
    }

    /// Best-effort restore of the registry to its pre-operation content.
    pub(crate) fn restore_registry_raw(&self, old_content: Option<&str>) {
        let path = self.cfg.registry_path();
        let result = match old_content {
            Some(contents) => fs::write(&path, contents),
            None => match fs::remove_file(&path) {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };
        if let Err(e) = result {
            tracing::warn!(
                "failed to restore sequence registry after aborted creation: {} - {}",
                path.display(),
                e
            );
        }
    }

    /// Generate a codification and sequential number for a new application.
    ///
    /// Reads the registry fresh and computes `current global maximum + 1`.
    /// Persists nothing — the caller binds the pair to a record and stores
    /// the updated registry inside the same critical section.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::CollisionDetected`] if the candidate
    /// codification has been issued before (retryable), or a persistence
    /// error if the registry cannot be read.
    pub fn generate(
        &self,
        investigation: InvestigationType,
        category: CategoryType,
        now: DateTime<Utc>,
    ) -> ApplicationResult<GeneratedCodification> {
        let registry = self.load_registry()?;
        self.candidate_from_registry(&registry, investigation, category, now, random_suffix)
    }

    /// As [`generate`](Self::generate), but against an already-loaded
    /// registry, so the caller can note the issue and store the registry
    /// back without a second read.
    pub(crate) fn candidate(
        &self,
        registry: &SequenceRegistry,
        investigation: InvestigationType,
        category: CategoryType,
        now: DateTime<Utc>,
    ) -> ApplicationResult<GeneratedCodification> {
        self.candidate_from_registry(registry, investigation, category, now, random_suffix)
    }

    /// Compute the candidate pair against an already-loaded registry.
    ///
    /// `suffix_source` produces the random disambiguator; tests inject a
    /// deterministic source to exercise the collision path.
    pub(crate) fn candidate_from_registry(
        &self,
        registry: &SequenceRegistry,
        investigation: InvestigationType,
        category: CategoryType,
        now: DateTime<Utc>,
        mut suffix_source: impl FnMut() -> String,
    ) -> ApplicationResult<GeneratedCodification> {
        let sequential_number = registry.last_sequential + 1;

        let codification = format!(
            "{}-{}-{}-{}-{}-{:03}-{}",
            self.cfg.codification_prefix(),
            now.format("%y"),
            now.format("%m"),
            investigation.code(),
            category.code(),
            sequential_number,
            suffix_source(),
        );

        if registry.contains(&codification) {
            return Err(ApplicationError::CollisionDetected { codification });
        }

        Ok(GeneratedCodification {
            codification,
            sequential_number,
        })
    }
}

/// A short lowercase hex disambiguator.
fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..CODIFICATION_SUFFIX_LEN)
        .map(|_| {
            char::from_digit(rng.gen_range(0..16), 16).expect("digit in radix range")
        })
        .collect()
}

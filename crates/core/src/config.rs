//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::{APPLICATIONS_DIR_NAME, DEFAULT_LOCK_WAIT_MS, REGISTRY_FILE_NAME};
use crate::error::{ApplicationError, ApplicationResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    application_data_dir: PathBuf,
    codification_prefix: String,
    lock_wait: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::InvalidInput` if `codification_prefix` is
    /// empty or spans multiple lines.
    pub fn new(
        application_data_dir: PathBuf,
        codification_prefix: String,
        lock_wait: Duration,
    ) -> ApplicationResult<Self> {
        let codification_prefix = codification_prefix.trim().to_string();
        if codification_prefix.is_empty() {
            return Err(ApplicationError::InvalidInput(
                "codification_prefix cannot be empty".into(),
            ));
        }
        if codification_prefix.contains(['\n', '\r']) {
            return Err(ApplicationError::InvalidInput(
                "codification_prefix must be single-line".into(),
            ));
        }

        Ok(Self {
            application_data_dir,
            codification_prefix,
            lock_wait,
        })
    }

    pub fn application_data_dir(&self) -> &Path {
        &self.application_data_dir
    }

    /// Root of the sharded application directories.
    pub fn applications_dir(&self) -> PathBuf {
        self.application_data_dir.join(APPLICATIONS_DIR_NAME)
    }

    /// Location of the global sequence registry.
    pub fn registry_path(&self) -> PathBuf {
        self.application_data_dir.join(REGISTRY_FILE_NAME)
    }

    pub fn codification_prefix(&self) -> &str {
        &self.codification_prefix
    }

    /// Bounded wait applied to every lock acquisition before the operation
    /// fails with `Contention`.
    pub fn lock_wait(&self) -> Duration {
        self.lock_wait
    }
}

/// Parse the lock wait from an optional environment value in milliseconds.
///
/// If `value` is `None` or empty/whitespace, returns the default.
pub fn lock_wait_from_env_value(value: Option<String>) -> ApplicationResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let millis = match value {
        Some(v) => v.parse::<u64>().map_err(|_| {
            ApplicationError::InvalidInput(format!("invalid lock wait milliseconds: {v}"))
        })?,
        None => DEFAULT_LOCK_WAIT_MS,
    };

    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_CODIFICATION_PREFIX;

    fn default_config(dir: &Path) -> CoreConfig {
        CoreConfig::new(
            dir.to_path_buf(),
            DEFAULT_CODIFICATION_PREFIX.to_string(),
            Duration::from_millis(DEFAULT_LOCK_WAIT_MS),
        )
        .expect("CoreConfig::new should succeed")
    }

    #[test]
    fn derived_paths_hang_off_the_data_dir() {
        let cfg = default_config(Path::new("/tmp/cera"));
        assert_eq!(
            cfg.applications_dir(),
            PathBuf::from("/tmp/cera/applications")
        );
        assert_eq!(cfg.registry_path(), PathBuf::from("/tmp/cera/registry.yaml"));
    }

    #[test]
    fn rejects_empty_prefix() {
        let err = CoreConfig::new(
            PathBuf::from("/tmp/cera"),
            "   ".into(),
            Duration::from_millis(100),
        )
        .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidInput(_)));
    }

    #[test]
    fn rejects_multiline_prefix() {
        let err = CoreConfig::new(
            PathBuf::from("/tmp/cera"),
            "CEISH\nESPOL".into(),
            Duration::from_millis(100),
        )
        .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidInput(_)));
    }

    #[test]
    fn lock_wait_defaults_when_unset() {
        let wait = lock_wait_from_env_value(None).unwrap();
        assert_eq!(wait, Duration::from_millis(DEFAULT_LOCK_WAIT_MS));

        let wait = lock_wait_from_env_value(Some("  ".into())).unwrap();
        assert_eq!(wait, Duration::from_millis(DEFAULT_LOCK_WAIT_MS));
    }

    #[test]
    fn lock_wait_parses_explicit_millis() {
        let wait = lock_wait_from_env_value(Some("250".into())).unwrap();
        assert_eq!(wait, Duration::from_millis(250));
    }

    #[test]
    fn lock_wait_rejects_garbage() {
        assert!(lock_wait_from_env_value(Some("soon".into())).is_err());
    }
}

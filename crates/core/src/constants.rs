//! Constants used throughout the CERA core crate.
//!
//! This module contains all path and filename constants to ensure
//! consistency across the codebase and make maintenance easier.

/// Directory name for application records storage.
pub const APPLICATIONS_DIR_NAME: &str = "applications";

/// Default directory for application data storage when no explicit directory is configured.
pub const DEFAULT_APPLICATION_DATA_DIR: &str = "application_data";

/// Default institutional prefix rendered into every codification.
pub const DEFAULT_CODIFICATION_PREFIX: &str = "CEISH-ESPOL";

/// Default bounded wait for application and creation locks, in milliseconds.
pub const DEFAULT_LOCK_WAIT_MS: u64 = 5_000;

/// Filename for the application record inside an application directory.
pub const APPLICATION_FILE_NAME: &str = "application.yaml";

/// Filename for the append-only status history inside an application directory.
pub const HISTORY_FILE_NAME: &str = "history.yaml";

/// Filename for the append-only review records inside an application directory.
pub const REVIEWS_FILE_NAME: &str = "reviews.yaml";

/// Filename for the global sequence registry at the data-directory root.
pub const REGISTRY_FILE_NAME: &str = "registry.yaml";

/// Number of hex characters in the random codification suffix.
pub const CODIFICATION_SUFFIX_LEN: usize = 6;

/// Content of the `.gitignore` written into every application directory.
pub const DEFAULT_GITIGNORE: &str = "# Application directories are fully versioned.\n";

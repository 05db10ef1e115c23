use crate::application::{ApplicationStatus, TransitionEvent};

#[derive(Debug, thiserror::Error)]
pub enum ApplicationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no application found with id {0}")]
    NotFound(String),
    #[error("invalid category type: {0}. Must be one of: GE, SH, AN")]
    InvalidCategory(String),
    #[error("invalid investigation type: {0}. Must be one of: EI, EO")]
    InvalidInvestigationType(String),
    #[error("unknown transition event: {0}")]
    InvalidEvent(String),
    #[error("cannot apply {event} to an application in status {from}")]
    InvalidTransition {
        from: ApplicationStatus,
        event: TransitionEvent,
    },
    #[error("codification {codification} already exists")]
    CollisionDetected { codification: String },
    #[error("timed out waiting for an application lock")]
    Contention,
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create application directory: {0}")]
    ApplicationDirCreation(std::io::Error),
    #[error(
        "create failed and cleanup also failed (path: {path}): create={create_error}; cleanup={cleanup_error}",
        path = path.display()
    )]
    CleanupAfterCreateFailed {
        path: std::path::PathBuf,
        #[source]
        create_error: Box<ApplicationError>,
        cleanup_error: std::io::Error,
    },
    #[error("failed to write application file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read application file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),

    #[error("identifier error: {0}")]
    Uuid(#[from] cera_uuid::UuidError),
    #[error("failed to initialise git repository: {0}")]
    GitInit(git2::Error),
    #[error("failed to open git repository: {0}")]
    GitOpen(git2::Error),
    #[error("failed to access git index: {0}")]
    GitIndex(git2::Error),
    #[error("failed to add file to git index: {0}")]
    GitAdd(git2::Error),
    #[error("failed to write git tree: {0}")]
    GitWriteTree(git2::Error),
    #[error("failed to find git tree: {0}")]
    GitFindTree(git2::Error),
    #[error("failed to create git signature: {0}")]
    GitSignature(git2::Error),
    #[error("failed to create git commit: {0}")]
    GitCommit(git2::Error),
    #[error("failed to get git head: {0}")]
    GitHead(git2::Error),
    #[error("failed to set git head: {0}")]
    GitSetHead(git2::Error),
    #[error("failed to peel git commit: {0}")]
    GitPeel(git2::Error),
}

pub type ApplicationResult<T> = std::result::Result<T, ApplicationError>;

impl ApplicationError {
    /// Whether retrying the whole operation may succeed without any change
    /// on the caller's side.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Contention | Self::CollisionDetected { .. }
        )
    }
}

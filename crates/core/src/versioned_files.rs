//! Versioned file operations with git-based version control.
//!
//! CERA stores each application as a small set of YAML documents on disk and
//! versions each application directory using a local git repository
//! (`git2`/libgit2). This module provides the high-level service the record
//! store and workflow engine build on:
//!
//! - **Atomic multi-file operations**: write the record, history and review
//!   files and commit them in a single transaction with automatic rollback on
//!   failure. A transition is either fully recorded or not recorded at all.
//! - **Consistent commit creation**: structured commit messages with a
//!   controlled vocabulary, so the git log doubles as a machine-readable
//!   audit trail.
//! - **Immutable audit trail**: nothing is ever deleted; every status change
//!   is one commit, preserved for compliance review.
//!
//! ## Commit message format
//!
//! - Subject line: `<domain>:<action>: <summary>`
//! - Trailers: `Actor-Id` and `Actor-Role` rendered from the acting
//!   [`Actor`], then any additional trailers sorted deterministically.
//! - No free-form prose paragraphs.
//!
//! The `Actor-*` trailer keys are reserved and can only be emitted from the
//! structured actor metadata.
//!
//! ## Branch policy
//!
//! CERA standardises on `refs/heads/main` for all application repositories.

use crate::actor::Actor;
use crate::error::{ApplicationError, ApplicationResult};
use cera_types::NonEmptyText;
use std::fmt;
use std::path::{Path, PathBuf};

#[cfg(test)]
use std::collections::HashSet;
#[cfg(test)]
use std::sync::{LazyLock, Mutex};

const MAIN_REF: &str = "refs/heads/main";

/// Controlled vocabulary for commit message domains.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum CommitDomain {
    /// The application record itself.
    Application,
    /// A status transition.
    Status,
    /// A reviewer action.
    Review,
}

impl CommitDomain {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Status => "status",
            Self::Review => "review",
        }
    }
}

impl fmt::Display for CommitDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controlled vocabulary for commit message actions.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum CommitAction {
    Create,
    Transition,
}

impl CommitAction {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Transition => "transition",
        }
    }
}

impl fmt::Display for CommitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single commit trailer line in standard git trailer format.
///
/// Renders as `Key: Value`. Trailers carry structured metadata beyond the
/// subject line and are sorted deterministically in rendered output.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct CommitTrailer {
    key: String,
    value: String,
}

impl CommitTrailer {
    /// Create a new commit trailer with validation.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::InvalidInput` if the key contains `:` or
    /// newlines, or either part is empty.
    pub(crate) fn new(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> ApplicationResult<Self> {
        let key = key.into().trim().to_string();
        let value = value.into().trim().to_string();

        if key.is_empty()
            || key.contains(['\n', '\r'])
            || key.contains(':')
            || value.is_empty()
            || value.contains(['\n', '\r'])
        {
            return Err(ApplicationError::InvalidInput(
                "commit trailer key/value must be non-empty and single-line (key cannot contain ':')".into()
            ));
        }

        Ok(Self { key, value })
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn value(&self) -> &str {
        &self.value
    }
}

/// A structured, predictable commit message.
///
/// Rendering rules:
///
/// - Subject line: `<domain>:<action>: <summary>`
/// - Trailers: `Actor-Id`/`Actor-Role` first, then any additional trailers
///   sorted deterministically; a single blank line separates subject from
///   trailers.
///
/// Commit messages are labels and indexes; do not put applicant-supplied
/// content in them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct CommitMessage {
    domain: CommitDomain,
    action: CommitAction,
    summary: NonEmptyText,
    trailers: Vec<CommitTrailer>,
}

impl CommitMessage {
    /// Create a new commit message with required fields.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::InvalidInput` if the summary is empty or
    /// contains newlines.
    pub(crate) fn new(
        domain: CommitDomain,
        action: CommitAction,
        summary: impl AsRef<str>,
    ) -> ApplicationResult<Self> {
        let summary_str = summary.as_ref().trim();
        if summary_str.contains(['\n', '\r']) {
            return Err(ApplicationError::InvalidInput(
                "commit summary must be single-line".into(),
            ));
        }
        let summary = NonEmptyText::new(summary_str).map_err(|_| {
            ApplicationError::InvalidInput("commit summary must be non-empty".into())
        })?;

        Ok(Self {
            domain,
            action,
            summary,
            trailers: Vec::new(),
        })
    }

    /// Add a trailer to the commit message.
    ///
    /// The `Actor-*` keys are reserved and can only be emitted from the
    /// structured actor metadata.
    ///
    /// # Errors
    ///
    /// Returns `ApplicationError::InvalidInput` for reserved or malformed
    /// keys/values.
    pub(crate) fn with_trailer(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> ApplicationResult<Self> {
        let key_str = key.into();
        if key_str.trim_start().starts_with("Actor-") {
            return Err(ApplicationError::InvalidInput(
                "Actor-* trailer keys are reserved".into(),
            ));
        }
        self.trailers.push(CommitTrailer::new(key_str, value.into())?);
        Ok(self)
    }

    /// Render the commit message including the mandatory actor trailers.
    ///
    /// The actor trailers are rendered deterministically in the order:
    ///
    /// - `Actor-Id`
    /// - `Actor-Role`
    ///
    /// followed by the remaining trailers sorted by key then value.
    pub(crate) fn render_with_actor(&self, actor: &Actor) -> String {
        let mut rendered = format!("{}:{}: {}", self.domain, self.action, self.summary.as_str());

        let mut other = self.trailers.clone();
        other.sort_by(|a, b| {
            let a_key = (a.key(), a.value());
            let b_key = (b.key(), b.value());
            a_key.cmp(&b_key)
        });

        rendered.push_str("\n\n");
        rendered.push_str("Actor-Id: ");
        rendered.push_str(actor.id.as_str());
        rendered.push('\n');
        rendered.push_str("Actor-Role: ");
        rendered.push_str(actor.role.as_str());

        for trailer in other {
            rendered.push('\n');
            rendered.push_str(trailer.key());
            rendered.push_str(": ");
            rendered.push_str(trailer.value());
        }

        rendered
    }
}

/// Represents a file to be written and committed.
///
/// Used with [`VersionedFileService::write_and_commit_files`] to write
/// multiple files in a single atomic commit operation.
#[derive(Debug, Clone)]
pub struct FileToWrite<'a> {
    /// The relative path to the file within the repository directory.
    pub relative_path: &'a Path,
    /// The new content to write to the file.
    pub content: &'a str,
    /// The previous file content for rollback. `None` if this is a new file.
    pub old_content: Option<&'a str>,
}

/// Service for managing versioned files with git version control.
///
/// `VersionedFileService` provides the write path for CERA's application
/// store: multi-file writes that either commit fully or roll every file back
/// to its previous content. The read path (`ApplicationStore`) never needs a
/// repository handle; plain file reads observe only committed state because
/// failed writers restore it before returning.
pub(crate) struct VersionedFileService {
    repo: git2::Repository,
    workdir: PathBuf,
}

impl VersionedFileService {
    /// Create a new git repository at the specified working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::GitInit`] if initialisation fails or the
    /// repository has no working directory.
    pub(crate) fn init(workdir: &Path) -> ApplicationResult<Self> {
        let repo = git2::Repository::init(workdir).map_err(ApplicationError::GitInit)?;
        let actual_workdir = repo
            .workdir()
            .ok_or_else(|| {
                ApplicationError::GitInit(git2::Error::from_str(
                    "repository has no working directory",
                ))
            })?
            .to_path_buf();
        Ok(Self {
            repo,
            workdir: actual_workdir,
        })
    }

    /// Open an existing git repository at the specified working directory.
    ///
    /// Opens with `NO_SEARCH` so git2 never walks up into a parent
    /// repository; application directories must stay isolated from each
    /// other and from any repository the data dir happens to live in.
    ///
    /// # Errors
    ///
    /// Returns [`ApplicationError::GitOpen`] if the repository does not
    /// exist, cannot be opened, or has no working directory.
    pub(crate) fn open(workdir: &Path) -> ApplicationResult<Self> {
        let repo = git2::Repository::open_ext(
            workdir,
            git2::RepositoryOpenFlags::NO_SEARCH,
            std::iter::empty::<&std::ffi::OsStr>(),
        )
        .map_err(ApplicationError::GitOpen)?;
        let actual_workdir = repo
            .workdir()
            .ok_or_else(|| {
                ApplicationError::GitOpen(git2::Error::from_str(
                    "repository has no working directory",
                ))
            })?
            .to_path_buf();
        Ok(Self {
            repo,
            workdir: actual_workdir,
        })
    }

    /// Ensure `HEAD` points at `refs/heads/main`.
    ///
    /// For newly initialised repositories this creates an "unborn" `main`
    /// branch that is born with the first commit.
    fn ensure_main_head(&self) -> ApplicationResult<()> {
        self.repo
            .set_head(MAIN_REF)
            .map_err(ApplicationError::GitSetHead)?;
        Ok(())
    }

    /// Create a commit including only the provided file paths (relative to
    /// the repo workdir).
    ///
    /// # Path rules
    ///
    /// `relative_paths` may contain repo-workdir-relative paths
    /// (recommended) or absolute paths under the repo workdir. Paths
    /// containing `..` are rejected.
    pub(crate) fn commit_paths(
        &self,
        actor: &Actor,
        message: &CommitMessage,
        relative_paths: &[PathBuf],
    ) -> ApplicationResult<git2::Oid> {
        #[cfg(test)]
        take_forced_commit_error()?;

        self.ensure_main_head()?;
        let mut index = self.repo.index().map_err(ApplicationError::GitIndex)?;

        for path in relative_paths {
            // `git2::Index::add_path` requires repo-workdir-relative paths.
            let rel = if path.is_absolute() {
                path.strip_prefix(&self.workdir)
                    .map_err(|_| {
                        ApplicationError::InvalidInput(
                            "path is outside the repository working directory".into(),
                        )
                    })?
                    .to_path_buf()
            } else {
                path.to_path_buf()
            };

            if rel
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
            {
                return Err(ApplicationError::InvalidInput(
                    "path must not contain parent directory references (..)".into(),
                ));
            }

            index.add_path(&rel).map_err(ApplicationError::GitAdd)?;
        }

        self.commit_from_index(actor, &message.render_with_actor(actor), &mut index)
    }

    /// Writes multiple files and commits them to git with rollback on failure.
    ///
    /// Opens the application's repository, writes all files and commits them
    /// in a single git commit. On any error:
    /// - files that previously existed are restored to their previous state,
    /// - new files are removed.
    ///
    /// This is the atomic unit behind every status transition: either the
    /// record, history and review files all advance together with one audit
    /// commit, or none of them change.
    ///
    /// # Errors
    ///
    /// Returns an `ApplicationError` if the repository cannot be opened, any
    /// file write fails, or the commit fails. The previous on-disk state is
    /// restored before the error is returned.
    pub(crate) fn write_and_commit_files(
        repo_path: &Path,
        actor: &Actor,
        msg: &CommitMessage,
        files: &[FileToWrite<'_>],
    ) -> ApplicationResult<()> {
        let repo = Self::open(repo_path)?;

        let mut written_files: Vec<(PathBuf, Option<String>)> = Vec::new();

        let result: ApplicationResult<()> = (|| {
            for file in files {
                let full_path = repo.workdir.join(file.relative_path);
                let old_content = file.old_content.map(|s| s.to_string());

                std::fs::write(&full_path, file.content).map_err(ApplicationError::FileWrite)?;
                written_files.push((full_path, old_content));
            }

            let paths: Vec<PathBuf> = files
                .iter()
                .map(|f| f.relative_path.to_path_buf())
                .collect();
            repo.commit_paths(actor, msg, &paths)?;

            Ok(())
        })();

        match result {
            Ok(()) => Ok(()),
            Err(write_error) => {
                // Rollback file changes (in reverse order)
                for (full_path, old_content) in written_files.iter().rev() {
                    match old_content {
                        Some(contents) => {
                            let _ = std::fs::write(full_path, contents);
                        }
                        None => {
                            let _ = std::fs::remove_file(full_path);
                        }
                    }
                }

                Err(write_error)
            }
        }
    }

    /// Initialise a git repository, commit initial files, and clean up on failure.
    ///
    /// This encapsulates the creation pattern:
    /// 1. initialise a git repository in a new application directory,
    /// 2. write and commit the initial files,
    /// 3. remove the entire directory if any step fails.
    ///
    /// Either the application directory exists fully formed with its first
    /// commit, or it does not exist at all.
    ///
    /// # Errors
    ///
    /// Returns the originating `ApplicationError`; if the cleanup itself also
    /// fails, returns [`ApplicationError::CleanupAfterCreateFailed`] carrying
    /// both errors.
    pub(crate) fn init_and_commit(
        application_dir: &Path,
        actor: &Actor,
        message: &CommitMessage,
        files: &[FileToWrite<'_>],
    ) -> ApplicationResult<()> {
        let result: ApplicationResult<()> = (|| {
            let _repo = Self::init(application_dir)?;
            Self::write_and_commit_files(application_dir, actor, message, files)?;
            Ok(())
        })();

        match result {
            Ok(()) => Ok(()),
            Err(create_error) => {
                if let Err(cleanup_err) = cleanup_application_dir(application_dir) {
                    return Err(ApplicationError::CleanupAfterCreateFailed {
                        path: application_dir.to_path_buf(),
                        create_error: Box::new(create_error),
                        cleanup_error: cleanup_err,
                    });
                }
                Err(create_error)
            }
        }
    }

    /// Create a commit from the current git index state.
    ///
    /// Validates nothing itself; the actor's fields are validated types.
    /// The commit author and committer are the acting user.
    fn commit_from_index(
        &self,
        actor: &Actor,
        message: &str,
        index: &mut git2::Index,
    ) -> ApplicationResult<git2::Oid> {
        let tree_id = index.write_tree().map_err(ApplicationError::GitWriteTree)?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(ApplicationError::GitFindTree)?;

        let sig = git2::Signature::now(actor.name.as_str(), actor.email.as_str())
            .map_err(ApplicationError::GitSignature)?;

        let parents = self.resolve_head_parents()?;
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .map_err(ApplicationError::GitCommit)
    }

    /// Resolve the parent commit(s) for a new commit.
    ///
    /// - If `HEAD` exists and points to a commit, that commit is the parent.
    /// - If the repository is empty (unborn branch or not found), the parent
    ///   list is empty.
    fn resolve_head_parents(&self) -> ApplicationResult<Vec<git2::Commit<'_>>> {
        match self.repo.head() {
            Ok(head) => {
                let commit = head.peel_to_commit().map_err(ApplicationError::GitPeel)?;
                Ok(vec![commit])
            }
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(vec![]),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(vec![]),
            Err(e) => Err(ApplicationError::GitHead(e)),
        }
    }

    /// Number of commits reachable from `HEAD`. Test support for audit
    /// assertions.
    #[cfg(test)]
    pub(crate) fn commit_count(workdir: &Path) -> ApplicationResult<usize> {
        let repo = Self::open(workdir)?;
        let head = repo.repo.head().map_err(ApplicationError::GitHead)?;
        let mut commit = head.peel_to_commit().map_err(ApplicationError::GitPeel)?;

        let mut count = 1;
        while let Ok(parent) = commit.parent(0) {
            count += 1;
            commit = parent;
        }
        Ok(count)
    }
}

#[cfg(test)]
static FORCE_CLEANUP_ERROR_FOR_THREADS: LazyLock<Mutex<HashSet<std::thread::ThreadId>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

#[cfg(test)]
static FORCE_COMMIT_ERROR_FOR_THREADS: LazyLock<Mutex<HashSet<std::thread::ThreadId>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

/// Arrange for the next commit attempt on this thread to fail after files
/// have been written. Used to exercise the rollback path.
#[cfg(test)]
pub(crate) fn force_commit_error_for_current_thread() {
    FORCE_COMMIT_ERROR_FOR_THREADS
        .lock()
        .expect("FORCE_COMMIT_ERROR_FOR_THREADS mutex poisoned")
        .insert(std::thread::current().id());
}

/// Arrange for the next directory cleanup on this thread to fail. Used to
/// exercise the `CleanupAfterCreateFailed` path.
#[cfg(test)]
pub(crate) fn force_cleanup_error_for_current_thread() {
    FORCE_CLEANUP_ERROR_FOR_THREADS
        .lock()
        .expect("FORCE_CLEANUP_ERROR_FOR_THREADS mutex poisoned")
        .insert(std::thread::current().id());
}

#[cfg(test)]
fn take_forced_commit_error() -> ApplicationResult<()> {
    let current_id = std::thread::current().id();
    let mut guard = FORCE_COMMIT_ERROR_FOR_THREADS
        .lock()
        .expect("FORCE_COMMIT_ERROR_FOR_THREADS mutex poisoned");

    if guard.remove(&current_id) {
        return Err(ApplicationError::GitCommit(git2::Error::from_str(
            "forced commit failure (test hook)",
        )));
    }
    Ok(())
}

fn cleanup_application_dir(application_dir: &Path) -> std::io::Result<()> {
    #[cfg(test)]
    {
        let current_id = std::thread::current().id();
        let mut guard = FORCE_CLEANUP_ERROR_FOR_THREADS
            .lock()
            .expect("FORCE_CLEANUP_ERROR_FOR_THREADS mutex poisoned");

        if guard.remove(&current_id) {
            return Err(std::io::Error::other("forced cleanup failure (test hook)"));
        }
    }

    std::fs::remove_dir_all(application_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::Role;
    use cera_types::{EmailAddress, NonEmptyText};
    use tempfile::TempDir;

    fn test_actor() -> Actor {
        Actor {
            id: NonEmptyText::new("user-1").unwrap(),
            name: NonEmptyText::new("Test Applicant").unwrap(),
            email: EmailAddress::parse("applicant@example.org").unwrap(),
            role: Role::Applicant,
        }
    }

    #[test]
    fn render_without_trailers_has_subject_and_actor_block() {
        let msg = CommitMessage::new(
            CommitDomain::Application,
            CommitAction::Create,
            "Application record created",
        )
        .unwrap();

        assert_eq!(
            msg.render_with_actor(&test_actor()),
            "application:create: Application record created\n\nActor-Id: user-1\nActor-Role: applicant"
        );
    }

    #[test]
    fn render_with_trailers_matches_git_trailer_format() {
        let msg = CommitMessage::new(
            CommitDomain::Status,
            CommitAction::Transition,
            "NOT_SUBMITTED -> UNDER_REVIEW",
        )
        .unwrap()
        .with_trailer("Transition-Event", "submit")
        .unwrap()
        .with_trailer("Application-Status", "UNDER_REVIEW")
        .unwrap();

        assert_eq!(
            msg.render_with_actor(&test_actor()),
            "status:transition: NOT_SUBMITTED -> UNDER_REVIEW\n\nActor-Id: user-1\nActor-Role: applicant\nApplication-Status: UNDER_REVIEW\nTransition-Event: submit"
        );
    }

    #[test]
    fn rejects_multiline_summary() {
        let err = CommitMessage::new(
            CommitDomain::Status,
            CommitAction::Transition,
            "line1\nline2",
        )
        .unwrap_err();

        assert!(matches!(err, ApplicationError::InvalidInput(_)));
    }

    #[test]
    fn rejects_reserved_actor_trailer_key() {
        let err = CommitMessage::new(CommitDomain::Status, CommitAction::Transition, "x")
            .unwrap()
            .with_trailer("Actor-Id", "impostor")
            .unwrap_err();

        assert!(matches!(err, ApplicationError::InvalidInput(_)));
    }

    #[test]
    fn rejects_invalid_trailer_key() {
        let err = CommitTrailer::new("Bad:Key", "Value").unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidInput(_)));
    }

    #[test]
    fn init_and_commit_creates_repository_with_one_commit() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("app");

        let msg =
            CommitMessage::new(CommitDomain::Application, CommitAction::Create, "created")
                .unwrap();
        let files = [FileToWrite {
            relative_path: Path::new("application.yaml"),
            content: "status: NOT_SUBMITTED\n",
            old_content: None,
        }];

        VersionedFileService::init_and_commit(&dir, &test_actor(), &msg, &files).unwrap();

        assert!(dir.join(".git").is_dir());
        assert!(dir.join("application.yaml").is_file());
        assert_eq!(VersionedFileService::commit_count(&dir).unwrap(), 1);
    }

    #[test]
    fn write_and_commit_appends_a_commit() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("app");

        let msg =
            CommitMessage::new(CommitDomain::Application, CommitAction::Create, "created")
                .unwrap();
        let files = [FileToWrite {
            relative_path: Path::new("application.yaml"),
            content: "status: NOT_SUBMITTED\n",
            old_content: None,
        }];
        VersionedFileService::init_and_commit(&dir, &test_actor(), &msg, &files).unwrap();

        let msg = CommitMessage::new(
            CommitDomain::Status,
            CommitAction::Transition,
            "NOT_SUBMITTED -> UNDER_REVIEW",
        )
        .unwrap();
        let files = [FileToWrite {
            relative_path: Path::new("application.yaml"),
            content: "status: UNDER_REVIEW\n",
            old_content: Some("status: NOT_SUBMITTED\n"),
        }];
        VersionedFileService::write_and_commit_files(&dir, &test_actor(), &msg, &files).unwrap();

        assert_eq!(VersionedFileService::commit_count(&dir).unwrap(), 2);
        let content = std::fs::read_to_string(dir.join("application.yaml")).unwrap();
        assert_eq!(content, "status: UNDER_REVIEW\n");
    }

    #[test]
    fn failed_commit_rolls_files_back() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("app");

        let msg =
            CommitMessage::new(CommitDomain::Application, CommitAction::Create, "created")
                .unwrap();
        let files = [FileToWrite {
            relative_path: Path::new("application.yaml"),
            content: "status: NOT_SUBMITTED\n",
            old_content: None,
        }];
        VersionedFileService::init_and_commit(&dir, &test_actor(), &msg, &files).unwrap();

        force_commit_error_for_current_thread();

        let msg = CommitMessage::new(
            CommitDomain::Status,
            CommitAction::Transition,
            "NOT_SUBMITTED -> UNDER_REVIEW",
        )
        .unwrap();
        let files = [
            FileToWrite {
                relative_path: Path::new("application.yaml"),
                content: "status: UNDER_REVIEW\n",
                old_content: Some("status: NOT_SUBMITTED\n"),
            },
            FileToWrite {
                relative_path: Path::new("history.yaml"),
                content: "- entry\n",
                old_content: Some("[]\n"),
            },
        ];
        // Seed the history file so rollback has something to restore.
        std::fs::write(dir.join("history.yaml"), "[]\n").unwrap();

        let err =
            VersionedFileService::write_and_commit_files(&dir, &test_actor(), &msg, &files)
                .unwrap_err();
        assert!(matches!(err, ApplicationError::GitCommit(_)));

        let content = std::fs::read_to_string(dir.join("application.yaml")).unwrap();
        assert_eq!(content, "status: NOT_SUBMITTED\n");
        let content = std::fs::read_to_string(dir.join("history.yaml")).unwrap();
        assert_eq!(content, "[]\n");
    }

    #[test]
    fn failed_init_removes_the_directory() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("app");

        force_commit_error_for_current_thread();

        let msg =
            CommitMessage::new(CommitDomain::Application, CommitAction::Create, "created")
                .unwrap();
        let files = [FileToWrite {
            relative_path: Path::new("application.yaml"),
            content: "status: NOT_SUBMITTED\n",
            old_content: None,
        }];

        let err = VersionedFileService::init_and_commit(&dir, &test_actor(), &msg, &files)
            .unwrap_err();
        assert!(matches!(err, ApplicationError::GitCommit(_)));
        assert!(!dir.exists(), "application directory should be removed");
    }

    #[test]
    fn failed_init_with_failed_cleanup_reports_both() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("app");

        force_commit_error_for_current_thread();
        force_cleanup_error_for_current_thread();

        let msg =
            CommitMessage::new(CommitDomain::Application, CommitAction::Create, "created")
                .unwrap();
        let files = [FileToWrite {
            relative_path: Path::new("application.yaml"),
            content: "status: NOT_SUBMITTED\n",
            old_content: None,
        }];

        let err = VersionedFileService::init_and_commit(&dir, &test_actor(), &msg, &files)
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::CleanupAfterCreateFailed { .. }
        ));
    }

    #[test]
    fn rejects_paths_with_parent_references() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("app");
        let service = VersionedFileService::init(&dir).unwrap();

        let msg =
            CommitMessage::new(CommitDomain::Application, CommitAction::Create, "created")
                .unwrap();
        let err = service
            .commit_paths(
                &test_actor(),
                &msg,
                &[PathBuf::from("../outside.yaml")],
            )
            .unwrap_err();

        assert!(matches!(err, ApplicationError::InvalidInput(_)));
    }
}

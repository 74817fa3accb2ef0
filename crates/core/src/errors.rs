//! Error types for the treesync core library.
//!
//! [`SyncError`] covers everything a run can fail with; [`ConfigError`] is
//! kept separate because configuration is loaded before a repository is
//! opened. Both derive their messages with `thiserror`.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Sync errors
// ---------------------------------------------------------------------------

/// Every way a synchronization run can fail.
///
/// None of these are retried. Up-to-date and declined runs are not errors;
/// they are reported through [`crate::engine::SyncOutcome`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// The given revision does not name a commit.
    #[error("bad revision '{0}': not a valid commit")]
    UnresolvableRef(String),

    /// Tracked files have uncommitted modifications.
    #[error("working tree has uncommitted changes ({count} paths); commit or stash them first")]
    DirtyWorkingTree { count: usize },

    /// A merge, rebase, cherry-pick or similar is already in progress.
    #[error("repository is in the middle of an operation ({0}); finish or abort it first")]
    MergeInProgress(String),

    /// A resync was requested but the histories never shared a tree.
    #[error("no common history: no commit on '{host}' has the same tree as any commit of {external}")]
    NoCommonHistory { host: String, external: String },

    /// The commit message was empty after editing.
    #[error("aborting import due to empty commit message")]
    AbortedEmptyMessage,

    /// The object store refused the import commit.
    #[error("failed to write import commit: {0}")]
    WriteFailure(String),

    /// `git merge` stopped with conflicts or another failure.
    #[error("merge of {commit} failed (exit {status}): {detail}")]
    MergeConflict {
        commit: String,
        status: i32,
        detail: String,
    },

    /// Fetching the external repository failed.
    #[error("failed to fetch '{rev}' from '{url}': {detail}")]
    Fetch {
        url: String,
        rev: String,
        detail: String,
    },

    /// An interactive collaborator (prompt or editor) failed.
    #[error("prompt failed: {0}")]
    Prompt(String),

    /// Configuration was invalid for this run.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// Generic I/O wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Process exit code for this failure.
    ///
    /// Each failure in the run state machine gets its own code so that
    /// scripts can tell a conflict from a bad revision.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::UnresolvableRef(_) | Self::RepositoryNotFound(_) => 2,
            Self::DirtyWorkingTree { .. } | Self::MergeInProgress(_) => 3,
            Self::NoCommonHistory { .. } => 4,
            Self::AbortedEmptyMessage => 5,
            Self::WriteFailure(_) => 6,
            Self::MergeConflict { .. } => 7,
            Self::Fetch { .. } => 8,
            Self::Prompt(_) | Self::Config(_) | Self::Git2Error(_) | Self::Io(_) => 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

//! treesync core library.
//!
//! Re-imports the current tree of an external project into a host Git
//! repository. Each run walks both histories, finds the last commit where
//! the two trees were identical, writes an import commit on top of it that
//! carries the external tree, and merges that commit into the host branch.
//!
//! The stages, in data-flow order:
//!
//! 1. [`history`] streams `(commit, tree)` pairs from a ref.
//! 2. [`resolver`] intersects two streams on tree identity.
//! 3. [`freshness`] decides whether anything needs importing.
//! 4. [`import`] writes the import commit.
//! 5. [`merge`] merges it into the current branch.
//!
//! [`engine::SyncEngine`] drives one run through those stages.

pub mod config;
pub mod engine;
pub mod errors;
pub mod fetch;
pub mod freshness;
pub mod git;
pub mod history;
pub mod import;
pub mod merge;
pub mod message;
pub mod prompt;
pub mod resolver;

// Re-exports for convenience.
pub use config::AppConfig;
pub use git2::Oid;
pub use engine::{SourceSpec, SyncEngine, SyncMode, SyncOutcome, SyncRequest};
pub use errors::SyncError;
pub use git::GitClient;
pub use prompt::{AutoConfirm, Prompter};

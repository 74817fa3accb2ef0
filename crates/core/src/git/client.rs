//! Local Git repository operations via `git2`.

use std::path::{Path, PathBuf};

use git2::{Oid, Repository, RepositoryState, Signature, StatusOptions};
use tracing::{debug, info, instrument};

use crate::config::IdentityConfig;
use crate::errors::SyncError;

/// High-level Git client wrapping the host `git2::Repository`.
pub struct GitClient {
    repo: Repository,
    workdir: PathBuf,
}

/// Information about a single Git commit, as shown in messages and prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub id: Oid,
    pub short_id: String,
    pub tree: Oid,
    pub summary: String,
}

impl GitClient {
    /// Open the repository containing `path`.
    ///
    /// Searches upwards like `git` does, so any directory inside the work
    /// tree is accepted. Bare repositories are rejected because the merge
    /// step needs a working tree.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, SyncError> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::discover(path)
            .map_err(|_| SyncError::RepositoryNotFound(path.display().to_string()))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| {
                SyncError::RepositoryNotFound(format!("{} (bare repository)", path.display()))
            })?
            .to_path_buf();
        Ok(Self { repo, workdir })
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    /// Root of the working tree.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Resolve a revision (branch, tag, short hash, `HEAD~2`, ...) to a commit id.
    pub fn resolve_commit(&self, rev: &str) -> Result<Oid, SyncError> {
        let object = self
            .repo
            .revparse_single(rev)
            .map_err(|_| SyncError::UnresolvableRef(rev.to_string()))?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| SyncError::UnresolvableRef(rev.to_string()))?;
        debug!(rev, commit = %commit.id(), "resolved revision");
        Ok(commit.id())
    }

    /// Short name of the current branch, or `HEAD` when detached.
    pub fn head_name(&self) -> String {
        match self.repo.head() {
            Ok(head) if head.is_branch() => head.shorthand().unwrap_or("HEAD").to_string(),
            _ => "HEAD".to_string(),
        }
    }

    /// Id, tree and one-line summary of `oid`.
    pub fn summarize(&self, oid: Oid) -> Result<CommitSummary, SyncError> {
        let commit = self.repo.find_commit(oid)?;
        let short = commit.as_object().short_id()?;
        Ok(CommitSummary {
            id: oid,
            short_id: short.as_str().unwrap_or_default().to_string(),
            tree: commit.tree_id(),
            summary: commit.summary().unwrap_or_default().to_string(),
        })
    }

    /// Refuse to start when the repository is mid-operation or has
    /// uncommitted changes to tracked files.
    ///
    /// Untracked files are allowed, matching what `git merge` itself
    /// tolerates. This is a check, not a lock.
    #[instrument(skip(self))]
    pub fn check_preconditions(&self) -> Result<(), SyncError> {
        let state = self.repo.state();
        if state != RepositoryState::Clean {
            return Err(SyncError::MergeInProgress(describe_state(state).to_string()));
        }

        let mut opts = StatusOptions::new();
        opts.include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        let count = statuses
            .iter()
            .filter(|entry| entry.status() != git2::Status::CURRENT)
            .count();
        if count > 0 {
            return Err(SyncError::DirtyWorkingTree { count });
        }

        debug!("working tree is clean");
        Ok(())
    }

    /// Signature for the import commit.
    ///
    /// An explicit identity from the configuration wins over the
    /// repository's `user.name` / `user.email`.
    pub fn signature(&self, identity: &IdentityConfig) -> Result<Signature<'static>, SyncError> {
        match (&identity.name, &identity.email) {
            (Some(name), Some(email)) => Ok(Signature::now(name, email)?),
            _ => Ok(self.repo.signature()?),
        }
    }
}

fn describe_state(state: RepositoryState) -> &'static str {
    match state {
        RepositoryState::Clean => "clean",
        RepositoryState::Merge => "merge",
        RepositoryState::Revert | RepositoryState::RevertSequence => "revert",
        RepositoryState::CherryPick | RepositoryState::CherryPickSequence => "cherry-pick",
        RepositoryState::Bisect => "bisect",
        RepositoryState::Rebase
        | RepositoryState::RebaseInteractive
        | RepositoryState::RebaseMerge => "rebase",
        RepositoryState::ApplyMailbox | RepositoryState::ApplyMailboxOrRebase => "am",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_with_commit(dir: &Path) -> Oid {
        let repo = Repository::init(dir).unwrap();
        std::fs::write(dir.join("hello.txt"), "hello world").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("hello.txt")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@test.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial commit", &tree, &[])
            .unwrap()
    }

    #[test]
    fn test_resolve_commit_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let oid = init_with_commit(dir.path());
        let client = GitClient::new(dir.path()).unwrap();

        assert_eq!(client.resolve_commit("HEAD").unwrap(), oid);
        let summary = client.summarize(oid).unwrap();
        assert_eq!(summary.summary, "initial commit");
        assert!(oid.to_string().starts_with(&summary.short_id));
        assert_eq!(client.resolve_commit(&summary.short_id).unwrap(), oid);
    }

    #[test]
    fn test_unresolvable_ref() {
        let dir = tempfile::tempdir().unwrap();
        init_with_commit(dir.path());
        let client = GitClient::new(dir.path()).unwrap();
        assert!(matches!(
            client.resolve_commit("no-such-branch"),
            Err(SyncError::UnresolvableRef(r)) if r == "no-such-branch"
        ));
    }

    #[test]
    fn test_dirty_tree_is_rejected_but_untracked_is_not() {
        let dir = tempfile::tempdir().unwrap();
        init_with_commit(dir.path());
        let client = GitClient::new(dir.path()).unwrap();

        std::fs::write(dir.path().join("scratch.txt"), "untracked").unwrap();
        client.check_preconditions().unwrap();

        std::fs::write(dir.path().join("hello.txt"), "changed").unwrap();
        assert!(matches!(
            client.check_preconditions(),
            Err(SyncError::DirtyWorkingTree { count: 1 })
        ));
    }

    #[test]
    fn test_merge_in_progress_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let oid = init_with_commit(dir.path());
        std::fs::write(dir.path().join(".git/MERGE_HEAD"), format!("{}\n", oid)).unwrap();

        let client = GitClient::new(dir.path()).unwrap();
        assert!(matches!(
            client.check_preconditions(),
            Err(SyncError::MergeInProgress(s)) if s == "merge"
        ));
    }

    #[test]
    fn test_signature_prefers_configured_identity() {
        let dir = tempfile::tempdir().unwrap();
        init_with_commit(dir.path());
        let client = GitClient::new(dir.path()).unwrap();
        let identity = IdentityConfig {
            name: Some("Vendor Bot".into()),
            email: Some("vendor@example.com".into()),
        };
        let sig = client.signature(&identity).unwrap();
        assert_eq!(sig.name(), Some("Vendor Bot"));
        assert_eq!(sig.email(), Some("vendor@example.com"));
    }

    #[test]
    fn test_repo_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            GitClient::new(&missing),
            Err(SyncError::RepositoryNotFound(_))
        ));
    }
}

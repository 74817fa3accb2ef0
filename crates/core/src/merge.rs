//! Merges the import commit into the current branch.
//!
//! The merge itself is delegated to the `git` binary so that conflicts land
//! in the working tree exactly as an ordinary `git merge` leaves them, with
//! `MERGE_HEAD` written and markers in the files. Resolving them is left to
//! the user's normal workflow.

use std::path::Path;
use std::process::Stdio;

use git2::{Oid, Repository};
use tokio::process::Command;
use tracing::{info, instrument, warn};

use crate::errors::SyncError;
use crate::freshness::ImportKind;

/// Build the `git merge` argument list for an import commit.
///
/// Always `--no-ff`; `--allow-unrelated-histories` only for a first import,
/// where the import commit shares no ancestor with the host.
pub fn merge_args(import_commit: Oid, kind: &ImportKind, message: &str) -> Vec<String> {
    let mut args = vec![
        "merge".to_string(),
        "--no-ff".to_string(),
        "--no-edit".to_string(),
        "-m".to_string(),
        message.to_string(),
    ];
    if kind.allows_unrelated_histories() {
        args.push("--allow-unrelated-histories".to_string());
    }
    args.push(import_commit.to_string());
    args
}

/// Run the merge in `workdir` and return the new head.
///
/// A non-zero exit from `git merge` is reported as
/// [`SyncError::MergeConflict`] with git's output; the working tree is left
/// as git left it.
#[instrument(skip_all, fields(workdir = %workdir.display(), commit = %import_commit))]
pub async fn merge_import(
    workdir: &Path,
    import_commit: Oid,
    kind: &ImportKind,
    message: &str,
) -> Result<Oid, SyncError> {
    let args = merge_args(import_commit, kind, message);
    info!(unrelated = kind.allows_unrelated_histories(), "merging import commit");

    let output = Command::new("git")
        .current_dir(workdir)
        .args(&args)
        .env("GIT_MERGE_AUTOEDIT", "no")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let mut detail = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !detail.is_empty() {
                detail.push('\n');
            }
            detail.push_str(stderr.trim());
        }
        let status = output.status.code().unwrap_or(-1);
        warn!(status, %detail, "git merge failed");
        return Err(SyncError::MergeConflict {
            commit: import_commit.to_string(),
            status,
            detail,
        });
    }

    // Re-open: the merge moved HEAD behind our back.
    let repo = Repository::open(workdir)?;
    let head = repo.head()?.peel_to_commit()?.id();
    info!(merge_commit = %head, "merge completed");
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oid() -> Oid {
        Oid::from_str("89abcdef0123456789abcdef0123456789abcdef").unwrap()
    }

    #[test]
    fn test_initial_merge_allows_unrelated_histories() {
        let args = merge_args(oid(), &ImportKind::Initial, "Merge tree of vendor");
        assert_eq!(
            args,
            vec![
                "merge",
                "--no-ff",
                "--no-edit",
                "-m",
                "Merge tree of vendor",
                "--allow-unrelated-histories",
                "89abcdef0123456789abcdef0123456789abcdef",
            ]
        );
    }

    #[test]
    fn test_resync_merge_is_plain_no_ff() {
        let kind = ImportKind::Resync { alignment: oid() };
        let args = merge_args(oid(), &kind, "m");
        assert!(args.contains(&"--no-ff".to_string()));
        assert!(!args.iter().any(|a| a == "--allow-unrelated-histories"));
        assert_eq!(args.last().unwrap(), &oid().to_string());
    }
}

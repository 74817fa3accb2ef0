//! Writes the import commit.
//!
//! The import commit carries the external tree verbatim and sits on top of
//! the alignment point (or nowhere, for a first import). No ref is moved;
//! the commit only becomes reachable once it is merged.

use git2::{Oid, Repository, Signature};
use tracing::{info, instrument};

use crate::errors::SyncError;
use crate::freshness::ImportKind;

/// Create the import commit and return its id.
///
/// `message` must already be normalized; an empty message aborts before
/// anything is written. Any object-store failure is reported as
/// [`SyncError::WriteFailure`] with the store's own text.
#[instrument(skip_all, fields(kind = ?kind, tree = %source_tree))]
pub fn build_import_commit(
    repo: &Repository,
    kind: &ImportKind,
    source_tree: Oid,
    message: &str,
    signature: &Signature<'_>,
) -> Result<Oid, SyncError> {
    if message.trim().is_empty() {
        return Err(SyncError::AbortedEmptyMessage);
    }

    let tree = repo.find_tree(source_tree).map_err(write_failure)?;
    let parent = kind
        .parent()
        .map(|oid| repo.find_commit(oid))
        .transpose()
        .map_err(write_failure)?;
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    let oid = repo
        .commit(None, signature, signature, message, &tree, &parents)
        .map_err(write_failure)?;

    // Read the object back: the import is only correct if it carries the
    // external tree exactly.
    let written = repo.find_commit(oid).map_err(write_failure)?;
    if written.tree_id() != source_tree {
        return Err(SyncError::WriteFailure(format!(
            "commit {} has tree {}, expected {}",
            oid,
            written.tree_id(),
            source_tree
        )));
    }

    info!(commit = %oid, parents = parents.len(), "wrote import commit");
    Ok(oid)
}

fn write_failure(e: git2::Error) -> SyncError {
    SyncError::WriteFailure(e.message().to_string())
}

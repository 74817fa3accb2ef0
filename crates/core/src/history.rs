//! Tree index over a commit history.
//!
//! [`HistoryStream`] walks every commit reachable from a starting commit and
//! yields its tree id alongside it. The walk is lazy: commits are looked up
//! one at a time as the iterator is advanced, so a consumer that stops at
//! the first hit never touches the rest of the history.

use git2::{Oid, Repository, Revwalk, Sort};
use tracing::trace;

use crate::errors::SyncError;

/// One `(commit, tree)` pair from a history walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub commit: Oid,
    pub tree: Oid,
}

/// Lazy walk over the history reachable from one commit.
///
/// Ordering is topological: a descendant is always yielded before any of
/// its ancestors. Commits that are topologically unordered relative to each
/// other come out newest first.
pub struct HistoryStream<'repo> {
    repo: &'repo Repository,
    walk: Revwalk<'repo>,
}

impl<'repo> HistoryStream<'repo> {
    /// Start a walk from `start`.
    ///
    /// `label` is only used for the error when `start` is not a commit.
    pub fn new(repo: &'repo Repository, start: Oid, label: &str) -> Result<Self, SyncError> {
        repo.find_commit(start)
            .map_err(|_| SyncError::UnresolvableRef(label.to_string()))?;

        let mut walk = repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        walk.push(start)?;
        Ok(Self { repo, walk })
    }
}

impl Iterator for HistoryStream<'_> {
    type Item = Result<HistoryEntry, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        let oid = match self.walk.next()? {
            Ok(oid) => oid,
            Err(e) => return Some(Err(e.into())),
        };
        let entry = self.repo.find_commit(oid).map(|commit| HistoryEntry {
            commit: oid,
            tree: commit.tree_id(),
        });
        if let Ok(ref e) = entry {
            trace!(commit = %e.commit, tree = %e.tree, "history entry");
        }
        Some(entry.map_err(SyncError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;

    /// Write a commit whose tree holds a single `file.txt` with `content`.
    fn commit(repo: &Repository, content: &str, parents: &[Oid]) -> Oid {
        let blob = repo.blob(content.as_bytes()).unwrap();
        let mut builder = repo.treebuilder(None).unwrap();
        builder.insert("file.txt", blob, 0o100644).unwrap();
        let tree = repo.find_tree(builder.write().unwrap()).unwrap();
        let parents: Vec<_> = parents.iter().map(|p| repo.find_commit(*p).unwrap()).collect();
        let parent_refs: Vec<_> = parents.iter().collect();
        let sig = Signature::now("T", "t@t.com").unwrap();
        repo.commit(None, &sig, &sig, content, &tree, &parent_refs)
            .unwrap()
    }

    #[test]
    fn test_descendants_come_before_ancestors() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let a = commit(&repo, "a", &[]);
        let b = commit(&repo, "b", &[a]);
        let c = commit(&repo, "c", &[a]);
        let m = commit(&repo, "m", &[b, c]);

        let order: Vec<Oid> = HistoryStream::new(&repo, m, "m")
            .unwrap()
            .map(|e| e.unwrap().commit)
            .collect();

        assert_eq!(order.len(), 4);
        assert_eq!(order[0], m);
        assert_eq!(order[3], a);
        assert!(order.contains(&b) && order.contains(&c));
    }

    #[test]
    fn test_entries_carry_commit_trees() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let a = commit(&repo, "same", &[]);
        let b = commit(&repo, "same", &[a]);

        let entries: Vec<HistoryEntry> = HistoryStream::new(&repo, b, "b")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(entries[0].commit, b);
        assert_eq!(entries[0].tree, repo.find_commit(b).unwrap().tree_id());
        // Distinct commits, identical snapshot.
        assert_eq!(entries[0].tree, entries[1].tree);
    }

    #[test]
    fn test_stream_is_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut tip = commit(&repo, "0", &[]);
        for i in 1..50 {
            tip = commit(&repo, &i.to_string(), &[tip]);
        }
        let mut stream = HistoryStream::new(&repo, tip, "tip").unwrap();
        assert_eq!(stream.next().unwrap().unwrap().commit, tip);
        assert_eq!(stream.by_ref().take(3).count(), 3);
    }

    #[test]
    fn test_bad_start_is_unresolvable() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        commit(&repo, "a", &[]);

        let missing = Oid::from_str("1234567890123456789012345678901234567890").unwrap();
        assert!(matches!(
            HistoryStream::new(&repo, missing, "deadbeef"),
            Err(SyncError::UnresolvableRef(r)) if r == "deadbeef"
        ));
    }
}

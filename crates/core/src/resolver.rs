//! Alignment search: where did the host last hold the external tree?
//!
//! The host and external histories are unrelated commit graphs, so ancestry
//! cannot connect them. What connects them is content: an import commit in
//! the host carries exactly the tree some external commit had. The resolver
//! finds the most recent external commit whose tree also appears in the
//! host history and reports the host commit holding that tree.
//!
//! Matching is on tree id only. Commit ids, authors and dates never take
//! part.

use std::collections::HashMap;

use git2::Oid;
use tracing::{debug, info};

use crate::history::HistoryEntry;

/// The last point at which host and external trees were identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alignment {
    /// Host-side commit holding the shared tree. Import commits attach here.
    pub host_commit: Oid,
    /// External commit with the same tree.
    pub source_commit: Oid,
    /// The shared tree.
    pub tree: Oid,
}

/// Intersect two histories on tree identity.
///
/// The external stream decides priority: its entries are scanned in order
/// and the first one whose tree occurs anywhere in the host history wins.
/// When that tree occurs more than once in the host, the first host commit
/// in host order is reported.
///
/// The host stream is drained into a tree → commit map up front; the
/// external stream is consumed lazily and abandoned at the first hit.
/// Returns `Ok(None)` when the histories share no tree at all.
pub fn find_alignment<H, S, E>(host: H, source: S) -> Result<Option<Alignment>, E>
where
    H: IntoIterator<Item = Result<HistoryEntry, E>>,
    S: IntoIterator<Item = Result<HistoryEntry, E>>,
{
    let mut host_trees: HashMap<Oid, Oid> = HashMap::new();
    for entry in host {
        let entry = entry?;
        host_trees.entry(entry.tree).or_insert(entry.commit);
    }
    debug!(distinct_trees = host_trees.len(), "indexed host history");

    let mut scanned = 0usize;
    for entry in source {
        let entry = entry?;
        scanned += 1;
        if let Some(&host_commit) = host_trees.get(&entry.tree) {
            info!(
                host_commit = %host_commit,
                source_commit = %entry.commit,
                tree = %entry.tree,
                scanned,
                "found alignment point"
            );
            return Ok(Some(Alignment {
                host_commit,
                source_commit: entry.commit,
                tree: entry.tree,
            }));
        }
    }

    info!(scanned, "histories share no tree");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn oid(n: u8) -> Oid {
        Oid::from_bytes(&[n; 20]).unwrap()
    }

    /// Build a stream from `(commit, tree)` byte pairs.
    fn stream(pairs: &[(u8, u8)]) -> Vec<Result<HistoryEntry, Infallible>> {
        pairs
            .iter()
            .map(|&(c, t)| {
                Ok(HistoryEntry {
                    commit: oid(c),
                    tree: oid(t),
                })
            })
            .collect()
    }

    #[test]
    fn test_no_shared_tree_is_none() {
        let host = stream(&[(1, 101), (2, 102)]);
        let source = stream(&[(11, 111), (12, 112)]);
        assert_eq!(find_alignment(host, source).unwrap(), None);
    }

    #[test]
    fn test_most_recent_external_match_wins() {
        // Host holds trees of both external commits 12 and 13; 12 is newer
        // in external order, so it wins even though 13's tree is newer in
        // the host.
        let host = stream(&[(1, 113), (2, 100), (3, 112)]);
        let source = stream(&[(11, 111), (12, 112), (13, 113)]);

        let found = find_alignment(host, source).unwrap().unwrap();
        assert_eq!(found.source_commit, oid(12));
        assert_eq!(found.host_commit, oid(3));
        assert_eq!(found.tree, oid(112));
    }

    #[test]
    fn test_repeated_host_tree_takes_first_in_host_order() {
        let host = stream(&[(1, 100), (2, 150), (3, 150)]);
        let source = stream(&[(11, 150)]);

        let found = find_alignment(host, source).unwrap().unwrap();
        assert_eq!(found.host_commit, oid(2));
    }

    #[test]
    fn test_alignment_tree_matches_both_sides() {
        let host = stream(&[(1, 7), (2, 8), (3, 9)]);
        let source = stream(&[(11, 5), (12, 9), (13, 8)]);
        let host_map: HashMap<Oid, Oid> = host
            .iter()
            .map(|e| {
                let e = e.as_ref().unwrap();
                (e.commit, e.tree)
            })
            .collect();

        let found = find_alignment(host.clone(), source).unwrap().unwrap();
        assert_eq!(host_map[&found.host_commit], found.tree);
        assert_eq!(found.tree, oid(9));
    }

    #[test]
    fn test_external_stream_stops_at_first_hit() {
        let host = stream(&[(1, 50)]);
        // Anything after the hit would be an error if it were pulled.
        let source: Vec<Result<HistoryEntry, &str>> = vec![
            Ok(HistoryEntry {
                commit: oid(11),
                tree: oid(50),
            }),
            Err("walked past the alignment"),
        ];
        let host: Vec<Result<HistoryEntry, &str>> =
            host.into_iter().map(|e| Ok(e.unwrap())).collect();

        let found = find_alignment(host, source).unwrap();
        assert_eq!(found.map(|a| a.source_commit), Some(oid(11)));
    }

    #[test]
    fn test_errors_propagate() {
        let host: Vec<Result<HistoryEntry, &str>> = vec![Err("corrupt object")];
        let source: Vec<Result<HistoryEntry, &str>> = Vec::new();
        assert_eq!(find_alignment(host, source), Err("corrupt object"));
    }
}

//! Decides whether a run has anything to import.

use git2::Oid;

use crate::resolver::Alignment;

/// Which operation the user asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// First import. Tolerates histories that never aligned.
    Init,
    /// Re-import on top of the last alignment. Requires one.
    Resync,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::Resync => write!(f, "resync"),
        }
    }
}

/// Shape of the import commit to build.
///
/// Drives both the parent list of the import commit and whether the merge
/// needs `--allow-unrelated-histories`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// No alignment: a root commit merged as an unrelated history.
    Initial,
    /// Child of the host commit at the alignment point.
    Resync { alignment: Oid },
}

impl ImportKind {
    /// Parents of the import commit. Never more than one.
    pub fn parent(&self) -> Option<Oid> {
        match self {
            Self::Initial => None,
            Self::Resync { alignment } => Some(*alignment),
        }
    }

    pub fn allows_unrelated_histories(&self) -> bool {
        matches!(self, Self::Initial)
    }
}

/// Verdict of the freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The host already holds the external tree at the alignment point.
    UpToDate(Alignment),
    /// An import commit of the given kind is needed.
    NeedsImport(ImportKind),
    /// Resync requested but the histories never aligned.
    NoCommonHistory,
}

/// Compare the alignment tree with the external head's tree.
///
/// `Init` with an existing alignment behaves like `Resync`, so the new
/// import stays connected to the previous one.
pub fn assess(mode: SyncMode, alignment: Option<&Alignment>, source_tree: Oid) -> Freshness {
    match (alignment, mode) {
        (Some(a), _) if a.tree == source_tree => Freshness::UpToDate(*a),
        (Some(a), _) => Freshness::NeedsImport(ImportKind::Resync {
            alignment: a.host_commit,
        }),
        (None, SyncMode::Init) => Freshness::NeedsImport(ImportKind::Initial),
        (None, SyncMode::Resync) => Freshness::NoCommonHistory,
    }
}

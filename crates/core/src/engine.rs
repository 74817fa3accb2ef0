//! One synchronization run, start to finish.
//!
//! The [`SyncEngine`] walks a run through its states:
//!
//! 1. Check the repository is clean and not mid-operation.
//! 2. Resolve (and if needed fetch) the external head and the host head.
//! 3. Search both histories for the alignment point.
//! 4. Stop if the host is up to date, or fail if a resync has nothing to
//!    attach to.
//! 5. Compose the import message, optionally through the editor.
//! 6. Write the import commit.
//! 7. Merge it into the current branch, unless the user declines.
//!
//! Nothing is cached between runs. Every run re-derives the alignment point
//! from the commit graph.

use git2::Oid;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::errors::SyncError;
use crate::fetch;
use crate::freshness;
use crate::git::client::{CommitSummary, GitClient};
use crate::history::HistoryStream;
use crate::import;
use crate::merge;
use crate::message::{self, MessageComposer, MessageFields};
use crate::prompt::Prompter;
use crate::resolver::{self, Alignment};

pub use crate::freshness::{Freshness, ImportKind, SyncMode};

// ---------------------------------------------------------------------------
// Requests & outcomes
// ---------------------------------------------------------------------------

/// Where the external tree comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// A revision already present in the host repository.
    Local { rev: String },
    /// A ref in another repository, fetched into the staging ref first.
    Remote { url: String, rev: String },
}

impl SourceSpec {
    /// Human description used in messages and prompts.
    pub fn describe(&self) -> String {
        match self {
            Self::Local { rev } => format!("'{}'", rev),
            Self::Remote { url, rev } => format!("'{}' of {}", rev, url),
        }
    }
}

impl std::fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Everything the caller decides about a run.
#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub mode: SyncMode,
    pub source: SourceSpec,
    /// Use this import message instead of the rendered template.
    pub message: Option<String>,
    /// Offer the message to the prompter's editor.
    pub edit: bool,
    /// Stop after the freshness check without writing anything.
    pub dry_run: bool,
}

impl SyncRequest {
    pub fn new(mode: SyncMode, source: SourceSpec) -> Self {
        Self {
            mode,
            source,
            message: None,
            edit: false,
            dry_run: false,
        }
    }
}

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The host already holds the external tree. Nothing was written.
    UpToDate { alignment: Alignment },
    /// Dry run: an import of this kind would have been made.
    WouldImport { kind: ImportKind, source_tree: Oid },
    /// The user declined the import. Nothing was written.
    Declined,
    /// The import commit was written but the user declined the merge.
    MergeSkipped { import_commit: Oid, kind: ImportKind },
    /// The import commit was written and merged.
    Merged { import_commit: Oid, merge_commit: Oid },
}

/// Read-only view of where host and source stand.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub branch: String,
    pub host: CommitSummary,
    pub source: CommitSummary,
    pub alignment: Option<Alignment>,
    pub freshness: Freshness,
}

/// States of a run, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    RefsResolved,
    AlignmentSearched,
    MessageComposed,
    ImportCommitWritten,
    MergeAttempted,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RefsResolved => write!(f, "refs_resolved"),
            Self::AlignmentSearched => write!(f, "alignment_searched"),
            Self::MessageComposed => write!(f, "message_composed"),
            Self::ImportCommitWritten => write!(f, "import_commit_written"),
            Self::MergeAttempted => write!(f, "merge_attempted"),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Drives synchronization runs against one host repository.
pub struct SyncEngine {
    git: GitClient,
    config: AppConfig,
    composer: MessageComposer,
}

struct Resolved {
    host: CommitSummary,
    source: CommitSummary,
    alignment: Option<Alignment>,
}

impl SyncEngine {
    pub fn new(git: GitClient, config: AppConfig) -> Self {
        let composer = MessageComposer::new(&config.message);
        Self {
            git,
            config,
            composer,
        }
    }

    pub fn git(&self) -> &GitClient {
        &self.git
    }

    /// Report alignment and freshness without prompting or writing.
    ///
    /// Remote sources are still fetched into the staging ref.
    pub fn status(&self, mode: SyncMode, source: &SourceSpec) -> Result<StatusReport, SyncError> {
        let resolved = self.resolve(source)?;
        let freshness = freshness::assess(mode, resolved.alignment.as_ref(), resolved.source.tree);
        Ok(StatusReport {
            branch: self.git.head_name(),
            host: resolved.host,
            source: resolved.source,
            alignment: resolved.alignment,
            freshness,
        })
    }

    /// Execute one full run.
    pub async fn run(
        &self,
        request: &SyncRequest,
        prompter: &mut dyn Prompter,
    ) -> Result<SyncOutcome, SyncError> {
        info!(mode = %request.mode, source = %request.source, "starting run");
        self.git.check_preconditions()?;

        let resolved = self.resolve(&request.source)?;
        let verdict = freshness::assess(
            request.mode,
            resolved.alignment.as_ref(),
            resolved.source.tree,
        );
        let kind = match verdict {
            Freshness::UpToDate(alignment) => {
                info!(host_commit = %alignment.host_commit, "already up to date");
                return Ok(SyncOutcome::UpToDate { alignment });
            }
            Freshness::NoCommonHistory => {
                return Err(SyncError::NoCommonHistory {
                    host: self.git.head_name(),
                    external: request.source.describe(),
                });
            }
            Freshness::NeedsImport(kind) => kind,
        };
        debug!(?kind, "import needed");

        if request.dry_run {
            return Ok(SyncOutcome::WouldImport {
                kind,
                source_tree: resolved.source.tree,
            });
        }

        if let ImportKind::Resync { alignment } = kind {
            let base = self.git.summarize(alignment)?;
            let question = format!(
                "Import {} at {} on top of {}?",
                request.source, resolved.source.short_id, base.short_id
            );
            if !prompter.confirm(&question)? {
                info!("import declined");
                return Ok(SyncOutcome::Declined);
            }
        }

        let description = request.source.describe();
        let fields = MessageFields {
            source: &description,
            short_id: &resolved.source.short_id,
            summary: &resolved.source.summary,
        };
        let import_message = self.compose_import_message(request, &fields, prompter)?;
        debug!(state = %RunState::MessageComposed, "message ready");

        let signature = self.git.signature(&self.config.identity)?;
        let import_commit = import::build_import_commit(
            self.git.repo(),
            &kind,
            resolved.source.tree,
            &import_message,
            &signature,
        )?;
        debug!(state = %RunState::ImportCommitWritten, commit = %import_commit);

        let import_short = self.git.summarize(import_commit)?.short_id;
        let question = format!(
            "Merge import commit {} into {}?",
            import_short,
            self.git.head_name()
        );
        if !prompter.confirm(&question)? {
            info!(commit = %import_commit, "merge declined");
            return Ok(SyncOutcome::MergeSkipped { import_commit, kind });
        }

        let merge_message = self.composer.merge_message(&fields);
        debug!(state = %RunState::MergeAttempted);
        let merge_commit =
            merge::merge_import(self.git.workdir(), import_commit, &kind, &merge_message).await?;

        info!(%import_commit, %merge_commit, "run complete");
        Ok(SyncOutcome::Merged {
            import_commit,
            merge_commit,
        })
    }

    /// Resolve both heads and search for the alignment point.
    fn resolve(&self, source: &SourceSpec) -> Result<Resolved, SyncError> {
        let source_commit = match source {
            SourceSpec::Local { rev } => self.git.resolve_commit(rev)?,
            SourceSpec::Remote { url, rev } => fetch::fetch_source(
                self.git.repo(),
                url,
                rev,
                &self.config.general.staging_ref,
                self.config.fetch.token.as_deref(),
            )?,
        };
        let host_commit = self.git.resolve_commit("HEAD")?;
        let host = self.git.summarize(host_commit)?;
        let source_summary = self.git.summarize(source_commit)?;
        debug!(state = %RunState::RefsResolved, host = %host.id, source = %source_summary.id);

        let repo = self.git.repo();
        let alignment = resolver::find_alignment(
            HistoryStream::new(repo, host_commit, "HEAD")?,
            HistoryStream::new(repo, source_commit, &source.describe())?,
        )?;
        debug!(state = %RunState::AlignmentSearched, found = alignment.is_some());

        Ok(Resolved {
            host,
            source: source_summary,
            alignment,
        })
    }

    fn compose_import_message(
        &self,
        request: &SyncRequest,
        fields: &MessageFields<'_>,
        prompter: &mut dyn Prompter,
    ) -> Result<String, SyncError> {
        let draft = match &request.message {
            Some(message) => message.clone(),
            None => self.composer.import_draft(fields),
        };
        let raw = if request.edit {
            prompter.edit(&message::editor_text(&draft))?
        } else {
            draft
        };
        let message = message::normalize(&raw);
        if message.is_empty() {
            return Err(SyncError::AbortedEmptyMessage);
        }
        Ok(message)
    }
}

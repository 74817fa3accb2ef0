//! Fetches an external repository's ref into a local staging ref.
//!
//! The rest of the pipeline only ever sees local commits; this module is the
//! bridge for `repository + ref` sources. The fetched head is stored under a
//! single staging ref (overwritten on every fetch) so it stays reachable
//! without touching branches or remote-tracking refs.

use git2::{Cred, Direction, FetchOptions, Oid, RemoteCallbacks, Repository};
use tracing::{debug, info, instrument};

use crate::errors::SyncError;

fn callbacks(token: Option<&str>) -> RemoteCallbacks<'static> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(tok) = token {
        let tok = tok.to_string();
        callbacks.credentials(move |_url, _username, _allowed| {
            Cred::userpass_plaintext("x-access-token", &tok)
        });
    }
    callbacks
}

/// Pick the advertised ref that `rev` refers to.
///
/// Exact names win, then branches, then tags, which mirrors how `git fetch`
/// interprets a short name.
pub fn pick_remote_ref(advertised: &[String], rev: &str) -> Option<String> {
    let candidates = [
        rev.to_string(),
        format!("refs/heads/{}", rev),
        format!("refs/tags/{}", rev),
    ];
    candidates
        .into_iter()
        .find(|candidate| advertised.iter().any(|name| name == candidate))
}

/// Fetch `rev` from `url` into `staging_ref` and return the fetched commit.
#[instrument(skip(repo, token))]
pub fn fetch_source(
    repo: &Repository,
    url: &str,
    rev: &str,
    staging_ref: &str,
    token: Option<&str>,
) -> Result<Oid, SyncError> {
    let fetch_err = |detail: String| SyncError::Fetch {
        url: url.to_string(),
        rev: rev.to_string(),
        detail,
    };

    info!("fetching external source");
    let mut remote = repo
        .remote_anonymous(url)
        .map_err(|e| fetch_err(e.message().to_string()))?;

    let advertised: Vec<String> = {
        let connection = remote
            .connect_auth(Direction::Fetch, Some(callbacks(token)), None)
            .map_err(|e| fetch_err(e.message().to_string()))?;
        let heads = connection
            .list()
            .map_err(|e| fetch_err(e.message().to_string()))?;
        heads.iter().map(|head| head.name().to_string()).collect()
    };
    debug!(count = advertised.len(), "remote advertised refs");

    let source_ref = pick_remote_ref(&advertised, rev)
        .ok_or_else(|| fetch_err("no such ref on the remote".to_string()))?;

    let mut fetch_opts = FetchOptions::new();
    fetch_opts.remote_callbacks(callbacks(token));
    let refspec = format!("+{}:{}", source_ref, staging_ref);
    remote
        .fetch(&[refspec.as_str()], Some(&mut fetch_opts), Some("treesync: fetch source"))
        .map_err(|e| fetch_err(e.message().to_string()))?;

    let commit = repo
        .find_reference(staging_ref)
        .and_then(|reference| reference.peel_to_commit())
        .map_err(|_| SyncError::UnresolvableRef(staging_ref.to_string()))?;

    info!(source_ref = %source_ref, commit = %commit.id(), "fetch completed");
    Ok(commit.id())
}

use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use super::error::ReconstructError;
use super::object_id::ObjectId;
use super::remote::{FetchOutcome, RemoteFetcher};
use super::resolve::fetch_object;
use super::store::LocalObjectStore;

pub const HEAD_FILE: &str = "HEAD";

/// What the head bootstrap learned and wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadResolution {
    /// Raw remote `HEAD` body, persisted verbatim.
    pub head_body: String,
    pub ref_path: String,
    pub head_id: ObjectId,
}

/// Extract the ref path from a `HEAD` body such as `ref: refs/heads/main`.
///
/// The keyword is not checked. The ref path must be relative and free of
/// `..` components since it is mirrored under the local metadata directory.
///
/// # Errors
///
/// Returns [`ReconstructError::MalformedHead`] when fewer than two tokens are
/// present or the ref path would escape the metadata directory.
pub fn parse_head(body: &str) -> Result<String, ReconstructError> {
    let malformed = || ReconstructError::MalformedHead {
        body: body.to_string(),
    };
    let ref_path = body.split_whitespace().nth(1).ok_or_else(malformed)?.trim();
    if !is_contained_path(ref_path) {
        return Err(malformed());
    }
    Ok(ref_path.to_string())
}

fn is_contained_path(raw: &str) -> bool {
    let path = Path::new(raw);
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

/// Fetch `HEAD`, the ref it names and the object the ref points at, writing
/// all three locally.
///
/// # Errors
///
/// Every failure here is fatal: an unavailable remote, a malformed `HEAD` or
/// ref, or a local write failure.
pub fn resolve_head(remote: &dyn RemoteFetcher, store: &LocalObjectStore) -> Result<HeadResolution> {
    info!(url = %remote.url_for(HEAD_FILE), "reading remote HEAD");
    let head_body = fetch_text(remote, HEAD_FILE)?;
    let ref_path = parse_head(&head_body)?;
    info!(head = %ref_path, "remote HEAD found");

    let head_file = store.write_ref(Path::new(HEAD_FILE), head_body.as_bytes())?;
    info!(path = %head_file.display(), "wrote HEAD");

    let ref_body = fetch_text(remote, &ref_path)?;
    let ref_id = ref_body.trim();
    let head_id = ObjectId::parse(ref_id).ok_or_else(|| ReconstructError::MalformedRef {
        path: ref_path.clone(),
        body: ref_body.clone(),
    })?;
    // The trimmed remote text is mirrored as is, without a trailing newline.
    let ref_file = store.write_ref(&PathBuf::from(&ref_path), ref_id.as_bytes())?;
    info!(id = %head_id, path = %ref_file.display(), "wrote head ref");

    fetch_object(remote, store, &head_id)?;
    info!(id = %head_id, "stored head object");

    Ok(HeadResolution {
        head_body,
        ref_path,
        head_id,
    })
}

fn fetch_text(remote: &dyn RemoteFetcher, path: &str) -> Result<String> {
    match remote.get(path)? {
        FetchOutcome::Found(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        FetchOutcome::Missing { status } => Err(ReconstructError::RemoteUnavailable {
            url: remote.url_for(path),
            status,
        }
        .into()),
    }
}

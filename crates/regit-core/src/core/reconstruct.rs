use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::config::ReconstructConfig;
use super::error::ReconstructError;
use super::head::{resolve_head, HeadResolution};
use super::oracle::{GitLogOracle, GraphOracle};
use super::outcome::ExecutionOutcome;
use super::remote::{HttpRemote, RemoteFetcher};
use super::resolve::{ResolutionLoop, ResolutionSummary, ResolveOptions, Termination};
use super::store::LocalObjectStore;
use super::workdir::WorkTree;

pub const HISTORY_CAVEAT: &str =
    "only history reachable from the remote HEAD is rebuilt; other branches and rebased commits may be missing";

#[derive(Debug, Clone)]
pub struct ReconstructRequest {
    pub url: String,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub head: HeadResolution,
    pub summary: ResolutionSummary,
}

/// Bootstrap from the remote `HEAD`, then resolve objects to a fixed point.
///
/// # Errors
///
/// Head resolution failures and oracle failures are returned; per-object
/// fetch failures end up in the summary instead.
pub fn run_pipeline(
    remote: &dyn RemoteFetcher,
    oracle: &dyn GraphOracle,
    store: &LocalObjectStore,
    options: ResolveOptions,
) -> Result<Reconstruction> {
    let head = resolve_head(remote, store)?;
    info!("resolving the rest of the objects from git log diagnostics");
    let summary = ResolutionLoop::new(oracle, remote, store, options).run()?;
    Ok(Reconstruction { head, summary })
}

/// Rebuild the repository exposed at `request.url` into `request.output`.
///
/// # Errors
///
/// Returns the first fatal error; callers turn it into an outcome with
/// [`error_outcome`].
pub fn reconstruct(
    request: &ReconstructRequest,
    config: &ReconstructConfig,
) -> Result<ExecutionOutcome> {
    let remote = HttpRemote::new(&request.url, config.http_timeout, config.keep_proxies)?;
    info!(url = %remote.base(), "using remote metadata directory");

    let tree = WorkTree::prepare(&request.output, &config.git)?;
    let store = LocalObjectStore::new(tree.git_dir());
    let oracle = GitLogOracle::new(config.git.clone(), tree.root());
    let options = ResolveOptions {
        max_iterations: config.max_iterations,
        jobs: config.jobs,
    };

    let result = run_pipeline(&remote, &oracle, &store, options)?;
    let stored = store.stored_ids()?.len();
    Ok(outcome_for(remote.base().as_str(), tree.root(), &result, stored))
}

/// Render a finished run as an outcome with JSON details.
#[must_use]
pub fn outcome_for(
    url: &str,
    output: &Path,
    result: &Reconstruction,
    stored_objects: usize,
) -> ExecutionOutcome {
    let summary = &result.summary;
    let mut details = json!({
        "url": url,
        "output": output.display().to_string(),
        "head": result.head.ref_path,
        "head_id": result.head.head_id,
        "iterations": summary.iterations,
        "termination": summary.termination,
        "stored_objects": stored_objects,
        "fetched": summary.fetched,
        "failed": summary.failed,
        "diagnostics": summary.diagnostics,
        "caveat": HISTORY_CAVEAT,
    });

    let outcome = match summary.termination {
        Termination::Complete => {
            let message = format!(
                "rebuilt {} from {} ({stored_objects} objects)",
                result.head.ref_path, url
            );
            if !summary.failed.is_empty() {
                insert_hint(
                    &mut details,
                    format!(
                        "{} object fetches failed along the way; git log no longer needs them",
                        summary.failed.len()
                    ),
                );
            }
            ExecutionOutcome::success(message, details)
        }
        Termination::Degenerate => {
            insert_hint(
                &mut details,
                format!(
                    "run `git fsck` in {} to inspect what is still broken",
                    output.display()
                ),
            );
            ExecutionOutcome::success(
                "best-effort rebuild: git log reports problems but names no missing objects",
                details,
            )
        }
        Termination::IterationCap => {
            insert_hint(
                &mut details,
                "raise --max-iterations, or drop it to run until git log is satisfied",
            );
            ExecutionOutcome::failure(
                format!(
                    "stopped after {} rounds with objects still missing",
                    summary.iterations
                ),
                details,
            )
        }
    };
    if !summary.failed.is_empty() {
        warn!(count = summary.failed.len(), "some objects could not be retrieved");
    }
    outcome
}

/// Map a fatal error onto a user error or failure outcome.
#[must_use]
pub fn error_outcome(err: &anyhow::Error) -> ExecutionOutcome {
    let Some(known) = err.downcast_ref::<ReconstructError>() else {
        return ExecutionOutcome::failure(format!("{err:#}"), json!({ "reason": "internal" }));
    };
    let (reason, hint) = match known {
        ReconstructError::InvalidUrl { .. } => (
            "invalid_url",
            "pass an http(s) URL such as http://example.com/ or http://example.com/.git/",
        ),
        ReconstructError::RemoteUnavailable { .. } => (
            "remote_unavailable",
            "check that the URL serves an exposed .git directory",
        ),
        ReconstructError::MalformedHead { .. } => (
            "malformed_head",
            "the remote HEAD should look like `ref: refs/heads/<branch>`",
        ),
        ReconstructError::MalformedRef { .. } => (
            "malformed_ref",
            "the ref named by HEAD should contain a single object id",
        ),
        ReconstructError::LocalWriteFailed { .. } => (
            "local_write_failed",
            "check permissions and free space for the output directory",
        ),
    };
    let details = json!({ "reason": reason, "hint": hint });
    if known.is_user_error() {
        ExecutionOutcome::user_error(known.to_string(), details)
    } else {
        ExecutionOutcome::failure(known.to_string(), details)
    }
}

fn insert_hint(details: &mut Value, hint: impl Into<String>) {
    if let Some(map) = details.as_object_mut() {
        map.insert("hint".to_string(), Value::String(hint.into()));
    }
}

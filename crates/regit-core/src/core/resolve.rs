//! Error-driven object resolution: ask the oracle what is missing, fetch
//! exactly that, repeat until the oracle is satisfied.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use super::error::ReconstructError;
use super::object_id::ObjectId;
use super::oracle::{GraphOracle, OracleReport};
use super::remote::{FetchOutcome, RemoteFetcher};
use super::store::{LocalObjectStore, WriteOutcome};

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The oracle traversed the whole history.
    Complete,
    /// The oracle failed without naming a single object id; best effort.
    Degenerate,
    /// The configured iteration cap was reached first.
    IterationCap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedObject {
    pub id: ObjectId,
    pub reason: String,
}

/// One fetch round: what it stored, what it could not, and whether the
/// oracle was satisfied afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationReport {
    pub complete: bool,
    pub fetched: Vec<ObjectId>,
    pub failed: Vec<FailedObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionSummary {
    /// Fetch rounds run (oracle checks that named missing ids).
    pub iterations: usize,
    pub fetched: Vec<ObjectId>,
    pub failed: Vec<FailedObject>,
    pub termination: Termination,
    /// Last oracle output when the loop stopped short of completeness.
    pub diagnostics: Option<String>,
}

impl ResolutionSummary {
    #[must_use]
    pub fn complete(&self) -> bool {
        self.termination == Termination::Complete
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub max_iterations: Option<usize>,
    pub jobs: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_iterations: None,
            jobs: 1,
        }
    }
}

/// Fetch one object by id and write it into the store.
///
/// # Errors
///
/// [`ReconstructError::RemoteUnavailable`] when the server does not serve the
/// object, [`ReconstructError::LocalWriteFailed`] when it cannot be stored,
/// or a transport error.
pub fn fetch_object(
    remote: &dyn RemoteFetcher,
    store: &LocalObjectStore,
    id: &ObjectId,
) -> Result<WriteOutcome> {
    let path = id.remote_path();
    info!(%id, url = %remote.url_for(&path), "downloading object");
    match remote.get(&path)? {
        FetchOutcome::Found(bytes) => Ok(store.write(id, &bytes)?),
        FetchOutcome::Missing { status } => Err(ReconstructError::RemoteUnavailable {
            url: remote.url_for(&path),
            status,
        }
        .into()),
    }
}

pub struct ResolutionLoop<'a> {
    oracle: &'a dyn GraphOracle,
    remote: &'a dyn RemoteFetcher,
    store: &'a LocalObjectStore,
    options: ResolveOptions,
}

impl<'a> ResolutionLoop<'a> {
    #[must_use]
    pub fn new(
        oracle: &'a dyn GraphOracle,
        remote: &'a dyn RemoteFetcher,
        store: &'a LocalObjectStore,
        options: ResolveOptions,
    ) -> Self {
        Self {
            oracle,
            remote,
            store,
            options,
        }
    }

    /// Run until the oracle reports completeness, names nothing actionable,
    /// or the optional iteration cap is hit.
    ///
    /// Per-object failures never abort the loop; they are collected in the
    /// summary and the oracle re-reports anything still missing.
    ///
    /// # Errors
    ///
    /// Returns an error only when the oracle itself cannot run or the fetch
    /// pool cannot be built.
    pub fn run(&self) -> Result<ResolutionSummary> {
        let pool = self.build_pool()?;
        let mut iterations = 0;
        let mut fetched = Vec::new();
        let mut failed = Vec::new();

        let mut report = self.oracle.check()?;
        let (termination, diagnostics) = loop {
            let (missing, diagnostics) = match report {
                OracleReport::Complete => break (Termination::Complete, None),
                OracleReport::Incomplete {
                    missing,
                    diagnostics,
                } if missing.is_empty() => {
                    warn!(
                        diagnostics = %diagnostics.trim(),
                        "oracle reports incompleteness but no actionable IDs found"
                    );
                    break (Termination::Degenerate, Some(diagnostics));
                }
                OracleReport::Incomplete {
                    missing,
                    diagnostics,
                } => (missing, diagnostics),
            };
            if let Some(cap) = self.options.max_iterations {
                if iterations >= cap {
                    warn!(
                        cap,
                        remaining = missing.len(),
                        diagnostics = %diagnostics.trim(),
                        "iteration cap reached"
                    );
                    break (Termination::IterationCap, Some(diagnostics));
                }
            }
            iterations += 1;
            info!(iteration = iterations, missing = missing.len(), "fetching missing objects");
            let mut round = self.fetch_batch(&missing, pool.as_ref());
            report = self.oracle.check()?;
            round.complete = report == OracleReport::Complete;
            info!(
                iteration = iterations,
                stored = round.fetched.len(),
                failed = round.failed.len(),
                complete = round.complete,
                "round finished"
            );
            fetched.extend(round.fetched);
            failed.extend(round.failed);
        };

        Ok(ResolutionSummary {
            iterations,
            fetched,
            failed,
            termination,
            diagnostics,
        })
    }

    /// Fetch every id of one batch, keeping the diagnostic order in the report.
    /// The returned report is not marked complete; only the oracle decides that.
    pub fn fetch_batch(
        &self,
        missing: &[ObjectId],
        pool: Option<&rayon::ThreadPool>,
    ) -> IterationReport {
        let fetch = |id: &ObjectId| (id.clone(), fetch_object(self.remote, self.store, id));
        let results: Vec<_> = match pool {
            Some(pool) => pool.install(|| missing.par_iter().map(fetch).collect()),
            None => missing.iter().map(fetch).collect(),
        };

        let mut report = IterationReport::default();
        for (id, result) in results {
            match result {
                Ok(outcome) => {
                    info!(%id, ?outcome, "stored object");
                    report.fetched.push(id);
                }
                Err(err) => {
                    warn!(%id, error = %format!("{err:#}"), "could not retrieve object");
                    report.failed.push(FailedObject {
                        id,
                        reason: format!("{err:#}"),
                    });
                }
            }
        }
        report
    }

    fn build_pool(&self) -> Result<Option<rayon::ThreadPool>> {
        if self.options.jobs <= 1 {
            return Ok(None);
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .thread_name(|idx| format!("regit-fetch-{idx}"))
            .build()
            .map(Some)
            .context("failed to build fetch pool")
    }
}

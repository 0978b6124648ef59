//! In-memory collaborators for exercising the resolution pipeline.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use super::object_id::ObjectId;
use super::oracle::{GraphOracle, OracleReport};
use super::remote::{FetchOutcome, RemoteFetcher};

#[derive(Debug, Default)]
pub(crate) struct MapRemote {
    files: HashMap<String, Vec<u8>>,
    broken: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl MapRemote {
    pub(crate) fn with(mut self, path: &str, body: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.to_string(), body.into());
        self
    }

    pub(crate) fn with_object(self, id: &ObjectId, body: impl Into<Vec<u8>>) -> Self {
        self.with(&id.remote_path(), body)
    }

    /// Make requests for `path` fail the way a dropped connection would.
    pub(crate) fn with_transport_error(mut self, path: &str) -> Self {
        self.broken.insert(path.to_string());
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl RemoteFetcher for MapRemote {
    fn get(&self, path: &str) -> Result<FetchOutcome> {
        self.requests
            .lock()
            .map_err(|_| anyhow!("request log poisoned"))?
            .push(path.to_string());
        if self.broken.contains(path) {
            return Err(anyhow!("connection reset while fetching {path}"));
        }
        Ok(match self.files.get(path) {
            Some(body) => FetchOutcome::Found(body.clone()),
            None => FetchOutcome::Missing { status: 404 },
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("http://remote.test/.git/{path}")
    }
}

/// Oracle that replays canned reports, then reports completeness forever.
#[derive(Debug, Default)]
pub(crate) struct ScriptedOracle {
    reports: Mutex<VecDeque<OracleReport>>,
    checks: Mutex<usize>,
}

impl ScriptedOracle {
    pub(crate) fn new(reports: impl IntoIterator<Item = OracleReport>) -> Self {
        Self {
            reports: Mutex::new(reports.into_iter().collect()),
            checks: Mutex::new(0),
        }
    }

    pub(crate) fn checks(&self) -> usize {
        self.checks.lock().map(|guard| *guard).unwrap_or_default()
    }
}

impl GraphOracle for ScriptedOracle {
    fn check(&self) -> Result<OracleReport> {
        *self
            .checks
            .lock()
            .map_err(|_| anyhow!("check counter poisoned"))? += 1;
        let next = self
            .reports
            .lock()
            .map_err(|_| anyhow!("script poisoned"))?
            .pop_front();
        Ok(next.unwrap_or(OracleReport::Complete))
    }
}

pub(crate) fn oid(fill: char) -> ObjectId {
    ObjectId::parse(&fill.to_string().repeat(40)).unwrap_or_else(|| panic!("bad fill {fill}"))
}

pub(crate) fn missing(ids: &[&ObjectId]) -> OracleReport {
    let diagnostics = ids
        .iter()
        .map(|id| format!("error: Could not read {id}\n"))
        .collect::<String>();
    OracleReport::Incomplete {
        missing: ids.iter().map(|id| (*id).clone()).collect(),
        diagnostics,
    }
}

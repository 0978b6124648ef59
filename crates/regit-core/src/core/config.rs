//! Process-wide options and the environment-derived reconstruction config.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_GIT: &str = "git";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_JOBS: usize = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// Tunables for one reconstruction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructConfig {
    /// Executable used for `git init` and the `git log` oracle.
    pub git: String,
    pub http_timeout: Duration,
    /// Optional cap on fetching iterations; `None` runs until a fixed point.
    pub max_iterations: Option<usize>,
    /// Concurrent fetches per iteration.
    pub jobs: usize,
    /// Let the HTTP client pick up `HTTP_PROXY` and friends.
    pub keep_proxies: bool,
}

impl Default for ReconstructConfig {
    fn default() -> Self {
        Self {
            git: DEFAULT_GIT.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            max_iterations: None,
            jobs: DEFAULT_JOBS,
            keep_proxies: false,
        }
    }
}

impl ReconstructConfig {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error when a `REGIT_*` variable holds an unparsable value.
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let mut config = Self::default();
        if let Some(git) = snapshot.var("REGIT_GIT") {
            config.git = git.to_string();
        }
        if let Some(raw) = snapshot.var("REGIT_HTTP_TIMEOUT") {
            config.http_timeout = Duration::from_secs(parse_positive("REGIT_HTTP_TIMEOUT", raw)?);
        }
        if let Some(raw) = snapshot.var("REGIT_MAX_ITERATIONS") {
            config.max_iterations = Some(to_usize(parse_positive("REGIT_MAX_ITERATIONS", raw)?));
        }
        if let Some(raw) = snapshot.var("REGIT_JOBS") {
            config.jobs = to_usize(parse_positive("REGIT_JOBS", raw)?);
        }
        config.keep_proxies = keep_proxies(snapshot);
        Ok(config)
    }

    /// Apply command-line overrides on top of the environment.
    #[must_use]
    pub fn with_overrides(
        mut self,
        timeout_secs: Option<u64>,
        max_iterations: Option<usize>,
        jobs: Option<usize>,
    ) -> Self {
        if let Some(secs) = timeout_secs.filter(|secs| *secs > 0) {
            self.http_timeout = Duration::from_secs(secs);
        }
        if let Some(cap) = max_iterations.filter(|cap| *cap > 0) {
            self.max_iterations = Some(cap);
        }
        if let Some(jobs) = jobs.filter(|jobs| *jobs > 0) {
            self.jobs = jobs;
        }
        self
    }
}

const PROXY_KEYS: [&str; 6] = [
    "HTTP_PROXY",
    "http_proxy",
    "HTTPS_PROXY",
    "https_proxy",
    "ALL_PROXY",
    "all_proxy",
];

/// `REGIT_KEEP_PROXIES` decides when present (`0/false/no/off` disable);
/// otherwise proxies are kept only if one of the usual proxy variables is set.
fn keep_proxies(snapshot: &EnvSnapshot) -> bool {
    if let Some(raw) = snapshot.vars.get("REGIT_KEEP_PROXIES") {
        let value = raw.trim().to_ascii_lowercase();
        return !matches!(value.as_str(), "" | "0" | "false" | "no" | "off");
    }
    PROXY_KEYS.iter().any(|key| snapshot.var(key).is_some())
}

fn parse_positive(key: &str, raw: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => bail!("{key} must be a positive integer (got {raw:?})"),
    }
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use super::object_id::ObjectId;
use super::process::run_command;

/// Prefix of the `git log` line emitted for an object it cannot read.
pub const UNREADABLE_MARKER: &str = "error: Could not read";
/// Whitespace-delimited token holding the id on a marker line:
/// `error: Could not read <id>`.
pub const UNREADABLE_ID_TOKEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleReport {
    Complete,
    Incomplete {
        /// Ids named by the diagnostics, in the order they appeared.
        missing: Vec<ObjectId>,
        diagnostics: String,
    },
}

/// Answers "can history be traversed from HEAD?" for the local store.
pub trait GraphOracle: Send + Sync {
    fn check(&self) -> Result<OracleReport>;
}

/// Extract object ids from free-form oracle diagnostics.
///
/// Only lines starting with [`UNREADABLE_MARKER`] are considered; the id is
/// token [`UNREADABLE_ID_TOKEN`] of that line. Tokens that are not object
/// names are dropped.
#[must_use]
pub fn parse_missing_ids(diagnostics: &str) -> Vec<ObjectId> {
    diagnostics
        .lines()
        .filter(|line| line.starts_with(UNREADABLE_MARKER))
        .filter_map(|line| {
            let token = line.split_whitespace().nth(UNREADABLE_ID_TOKEN);
            let parsed = token.and_then(ObjectId::parse);
            if parsed.is_none() {
                debug!(line, "marker line without a usable object id");
            }
            parsed
        })
        .collect()
}

/// Oracle backed by `git log` run inside the reconstructed work tree.
#[derive(Debug, Clone)]
pub struct GitLogOracle {
    git: String,
    work_tree: PathBuf,
}

impl GitLogOracle {
    #[must_use]
    pub fn new(git: impl Into<String>, work_tree: impl Into<PathBuf>) -> Self {
        Self {
            git: git.into(),
            work_tree: work_tree.into(),
        }
    }

    #[must_use]
    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }
}

impl GraphOracle for GitLogOracle {
    fn check(&self) -> Result<OracleReport> {
        // Diagnostics are matched verbatim, so keep git's messages untranslated.
        let output = run_command(
            &self.git,
            &["log", "--format=%H"],
            &[("LC_ALL", "C"), ("GIT_PAGER", "cat")],
            &self.work_tree,
        )?;
        if output.succeeded() && output.stderr.trim().is_empty() {
            return Ok(OracleReport::Complete);
        }
        debug!(code = output.code, stderr = %output.stderr.trim(), "git log reported problems");
        Ok(OracleReport::Incomplete {
            missing: parse_missing_ids(&output.stderr),
            diagnostics: output.stderr,
        })
    }
}

#![deny(clippy::all, warnings)]

//! Rebuild a git object store from a `.git` directory that a web server
//! exposes by accident.
//!
//! The remote cannot be listed, so objects are discovered by asking `git log`
//! what it fails to read and fetching exactly those ids until it stops
//! complaining.

mod core;

pub use crate::core::config::{
    GlobalOptions, ReconstructConfig, DEFAULT_GIT, DEFAULT_HTTP_TIMEOUT, DEFAULT_JOBS,
};
pub use crate::core::error::ReconstructError;
pub use crate::core::head::{parse_head, resolve_head, HeadResolution};
pub use crate::core::object_id::ObjectId;
pub use crate::core::oracle::{
    parse_missing_ids, GitLogOracle, GraphOracle, OracleReport, UNREADABLE_ID_TOKEN,
    UNREADABLE_MARKER,
};
pub use crate::core::outcome::{to_json_response, CommandStatus, ExecutionOutcome};
pub use crate::core::process::{run_command, RunOutput};
pub use crate::core::reconstruct::{
    error_outcome, outcome_for, reconstruct, run_pipeline, ReconstructRequest, Reconstruction,
    HISTORY_CAVEAT,
};
pub use crate::core::remote::{normalize_base_url, FetchOutcome, HttpRemote, RemoteFetcher};
pub use crate::core::resolve::{
    fetch_object, FailedObject, IterationReport, ResolutionLoop, ResolutionSummary,
    ResolveOptions, Termination,
};
pub use crate::core::store::{LocalObjectStore, WriteOutcome};
pub use crate::core::workdir::{WorkTree, DEFAULT_OUTPUT_DIR};

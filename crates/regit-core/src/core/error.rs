use std::path::PathBuf;

/// Fatal conditions surfaced while bootstrapping a reconstruction.
///
/// Per-object failures inside the resolution loop use the same variants but
/// are recorded in the failed set instead of being returned.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReconstructError {
    #[error("[RG100] invalid remote url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("[RG101] remote {url} is unavailable (status {status})")]
    RemoteUnavailable { url: String, status: u16 },
    #[error("[RG102] remote HEAD is malformed: {body:?}")]
    MalformedHead { body: String },
    #[error("[RG103] remote ref {path} does not name an object: {body:?}")]
    MalformedRef { path: String, body: String },
    #[error("[RG110] failed to write {}: {reason}", path.display())]
    LocalWriteFailed { path: PathBuf, reason: String },
}

impl ReconstructError {
    /// Errors caused by what the operator pointed us at, as opposed to
    /// transport or filesystem trouble.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::MalformedHead { .. } | Self::MalformedRef { .. }
        )
    }

    pub(crate) fn write_failed(path: impl Into<PathBuf>, err: &impl std::fmt::Display) -> Self {
        Self::LocalWriteFailed {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

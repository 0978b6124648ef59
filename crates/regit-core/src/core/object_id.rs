use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub(crate) const OBJECTS_DIR: &str = "objects";

/// Hex lengths of SHA-1 and SHA-256 object names.
const ACCEPTED_LENGTHS: [usize; 2] = [40, 64];

/// Textual name of a git object. Opaque apart from the two-level shard path
/// derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse an object name, trimming surrounding whitespace.
    ///
    /// Returns `None` unless the input is 40 or 64 hex characters.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if !ACCEPTED_LENGTHS.contains(&trimmed.len()) {
            return None;
        }
        hex::decode(trimmed).ok()?;
        Some(Self(trimmed.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shard directory: the first two hex characters.
    #[must_use]
    pub fn shard(&self) -> &str {
        &self.0[..2]
    }

    /// File name inside the shard directory.
    #[must_use]
    pub fn rest(&self) -> &str {
        &self.0[2..]
    }

    /// Request path relative to the remote metadata directory.
    #[must_use]
    pub fn remote_path(&self) -> String {
        format!("{OBJECTS_DIR}/{}/{}", self.shard(), self.rest())
    }

    /// Path relative to the local metadata directory.
    #[must_use]
    pub fn local_path(&self) -> PathBuf {
        PathBuf::from(OBJECTS_DIR).join(self.shard()).join(self.rest())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

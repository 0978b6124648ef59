use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::error::ReconstructError;
use super::object_id::{ObjectId, OBJECTS_DIR};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// An object with this id is already on disk; ids are content hashes so
    /// its bytes are taken as correct.
    AlreadyPresent,
}

/// Write-once view over a repository's loose object directory plus its ref
/// namespace.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    git_dir: PathBuf,
}

impl LocalObjectStore {
    #[must_use]
    pub fn new(git_dir: impl Into<PathBuf>) -> Self {
        Self {
            git_dir: git_dir.into(),
        }
    }

    #[must_use]
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    #[must_use]
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.git_dir.join(id.local_path())
    }

    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).is_file()
    }

    /// Persist raw object bytes under the shard path for `id`.
    ///
    /// The bytes land in a temp file inside the shard directory and are moved
    /// into place without clobbering, so readers never observe a partial
    /// object.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructError::LocalWriteFailed`] when the shard directory
    /// or the object file cannot be written.
    pub fn write(&self, id: &ObjectId, bytes: &[u8]) -> Result<WriteOutcome, ReconstructError> {
        let dest = self.object_path(id);
        if dest.is_file() {
            debug!(%id, "object already present");
            return Ok(WriteOutcome::AlreadyPresent);
        }
        let shard_dir = dest
            .parent()
            .map_or_else(|| self.git_dir.join(OBJECTS_DIR), Path::to_path_buf);
        fs::create_dir_all(&shard_dir)
            .map_err(|err| ReconstructError::write_failed(&shard_dir, &err))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".regit-")
            .tempfile_in(&shard_dir)
            .map_err(|err| ReconstructError::write_failed(&shard_dir, &err))?;
        tmp.write_all(bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|err| ReconstructError::write_failed(tmp.path(), &err))?;

        match tmp.persist_noclobber(&dest) {
            Ok(_) => {
                debug!(%id, bytes = bytes.len(), "object written");
                Ok(WriteOutcome::Written)
            }
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                Ok(WriteOutcome::AlreadyPresent)
            }
            Err(err) => Err(ReconstructError::write_failed(&dest, &err.error)),
        }
    }

    /// Replace a file under the metadata directory (`HEAD`, a ref path).
    ///
    /// Any existing file is removed first; parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`ReconstructError::LocalWriteFailed`] on filesystem errors.
    pub fn write_ref(&self, rel_path: &Path, contents: &[u8]) -> Result<PathBuf, ReconstructError> {
        let dest = self.git_dir.join(rel_path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|err| ReconstructError::write_failed(parent, &err))?;
        }
        match fs::remove_file(&dest) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(ReconstructError::write_failed(&dest, &err)),
        }
        fs::write(&dest, contents).map_err(|err| ReconstructError::write_failed(&dest, &err))?;
        Ok(dest)
    }

    /// Every loose object currently on disk, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error when the objects directory cannot be read.
    pub fn stored_ids(&self) -> Result<Vec<ObjectId>> {
        let root = self.git_dir.join(OBJECTS_DIR);
        let mut ids = Vec::new();
        let entries = match fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(ids),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", root.display()))
            }
        };
        for shard in entries.flatten() {
            let shard_name = shard.file_name().to_string_lossy().to_string();
            if shard_name.len() != 2 || !shard.path().is_dir() {
                continue;
            }
            let files = fs::read_dir(shard.path())
                .with_context(|| format!("failed to read {}", shard.path().display()))?;
            for file in files.flatten() {
                let name = file.file_name().to_string_lossy().to_string();
                if let Some(id) = ObjectId::parse(&format!("{shard_name}{name}")) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(fill: char) -> ObjectId {
        ObjectId::parse(&fill.to_string().repeat(40)).expect("valid id")
    }

    #[test]
    fn write_creates_shard_directory() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = LocalObjectStore::new(temp.path().join(".git"));
        let oid = id('a');

        assert!(!store.contains(&oid));
        assert_eq!(store.write(&oid, b"payload")?, WriteOutcome::Written);
        assert!(store.contains(&oid));

        let expected = temp
            .path()
            .join(".git")
            .join("objects")
            .join("aa")
            .join("a".repeat(38));
        assert_eq!(store.object_path(&oid), expected);
        assert_eq!(fs::read(expected)?, b"payload");
        Ok(())
    }

    #[test]
    fn repeated_write_is_a_successful_no_op() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = LocalObjectStore::new(temp.path());
        let oid = id('b');

        assert_eq!(store.write(&oid, b"same")?, WriteOutcome::Written);
        let before = store.stored_ids()?;
        assert_eq!(store.write(&oid, b"same")?, WriteOutcome::AlreadyPresent);
        assert_eq!(store.stored_ids()?, before);
        assert_eq!(fs::read(store.object_path(&oid))?, b"same");
        Ok(())
    }

    #[test]
    fn existing_object_is_never_overwritten() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = LocalObjectStore::new(temp.path());
        let oid = id('c');
        store.write(&oid, b"first")?;
        assert_eq!(store.write(&oid, b"second")?, WriteOutcome::AlreadyPresent);
        assert_eq!(fs::read(store.object_path(&oid))?, b"first");
        Ok(())
    }

    #[test]
    fn write_leaves_no_temp_files_behind() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = LocalObjectStore::new(temp.path());
        let oid = id('d');
        store.write(&oid, b"bytes")?;
        let shard = store.object_path(&oid);
        let shard = shard.parent().expect("shard dir");
        let names: Vec<_> = fs::read_dir(shard)?
            .flatten()
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["d".repeat(38)]);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn write_reports_unwritable_store() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let blocker = temp.path().join("objects");
        fs::write(&blocker, b"not a directory")?;
        let store = LocalObjectStore::new(temp.path());
        let err = store.write(&id('e'), b"x").expect_err("objects is a file");
        assert!(matches!(err, ReconstructError::LocalWriteFailed { .. }));
        Ok(())
    }

    #[test]
    fn write_ref_replaces_stale_contents() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = LocalObjectStore::new(temp.path());
        let rel = Path::new("refs").join("heads").join("main");

        store.write_ref(&rel, b"stale\n")?;
        let path = store.write_ref(&rel, b"fresh\n")?;
        assert_eq!(path, temp.path().join(&rel));
        assert_eq!(fs::read_to_string(path)?, "fresh\n");
        Ok(())
    }

    #[test]
    fn stored_ids_skips_foreign_entries() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let store = LocalObjectStore::new(temp.path());
        store.write(&id('f'), b"1")?;
        store.write(&id('0'), b"2")?;
        fs::create_dir_all(temp.path().join("objects").join("info"))?;
        fs::create_dir_all(temp.path().join("objects").join("pack"))?;
        fs::write(temp.path().join("objects").join("ff").join("junk"), b"")?;

        assert_eq!(store.stored_ids()?, vec![id('0'), id('f')]);
        Ok(())
    }
}

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ArtifactStorageError {
    #[error("path '{0}' is outside the artifact root")]
    OutsideRoot(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Generated artifact files under one root directory.
///
/// Writes go through a temp file in `<root>/tmp` and are renamed into place,
/// so a reader never sees a half-written artifact.
pub struct ArtifactStorage {
    base_path: PathBuf,
}

impl ArtifactStorage {
    pub fn new(root: &Path) -> Self {
        Self {
            base_path: root.to_path_buf(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.base_path
    }

    /// Directory holding the artifacts of one tenant project.
    #[must_use]
    pub fn scope_dir(&self, scope_digest: &str) -> PathBuf {
        self.base_path.join(scope_digest)
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join("tmp")
            .join(Uuid::new_v4().to_string())
    }

    fn check_inside(&self, path: &Path) -> Result<(), ArtifactStorageError> {
        if path.starts_with(&self.base_path) && path != self.base_path {
            Ok(())
        } else {
            Err(ArtifactStorageError::OutsideRoot(path.to_path_buf()))
        }
    }

    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Writes `data` to `path` atomically, creating parent directories.
    pub fn put(&self, path: &Path, data: &[u8]) -> Result<(), ArtifactStorageError> {
        self.check_inside(path)?;

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut temp_file = File::create(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        Ok(())
    }

    /// Removes a file. Returns `false` when it was already gone.
    pub fn delete(&self, path: &Path) -> Result<bool, ArtifactStorageError> {
        self.check_inside(path)?;

        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ArtifactStorageError::Io(e)),
        }
    }

    /// Removes `dir` if it exists and is empty. Never removes the root.
    pub fn remove_dir_if_empty(&self, dir: &Path) -> Result<bool, ArtifactStorageError> {
        self.check_inside(dir)?;

        let mut entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        if entries.next().is_some() {
            return Ok(false);
        }

        match fs::remove_dir(dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Walks up from the parent of `path` removing empty directories until
    /// the root or a non-empty directory is reached.
    pub fn prune_empty_parents(&self, path: &Path) -> Result<Vec<PathBuf>, ArtifactStorageError> {
        let mut removed = Vec::new();
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.base_path || !dir.starts_with(&self.base_path) {
                break;
            }
            if !self.remove_dir_if_empty(dir)? {
                break;
            }
            removed.push(dir.to_path_buf());
            current = dir.parent();
        }
        Ok(removed)
    }
}

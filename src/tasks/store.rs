//! Task Store
//!
//! Maps SHA-256 digests to file contents. The storage path of a task file is
//! a function of its content only.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::storage::Layout;

/// A task file known to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTask {
    pub digest: String,
    pub path: PathBuf,
    /// False when identical content was already stored
    pub written: bool,
}

/// Content-addressed storage under `tasks/`
#[derive(Debug, Clone)]
pub struct TaskStore {
    base_path: PathBuf,
    staging_path: PathBuf,
}

impl TaskStore {
    pub fn new(layout: &Layout) -> Self {
        Self {
            base_path: layout.tasks_dir(),
            staging_path: layout.staging_dir(),
        }
    }

    /// `tasks/<first hex digit>/<digest>`
    pub fn path_for(&self, digest: &str) -> PathBuf {
        let fanout = digest.get(..1).unwrap_or("_");
        self.base_path.join(fanout).join(digest)
    }

    pub fn contains(&self, digest: &str) -> bool {
        self.path_for(digest).is_file()
    }

    /// Read a task file by digest
    pub fn read(&self, digest: &str) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(self.path_for(digest)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Store `data` under its digest.
    ///
    /// Existing content is left untouched. New content is written to the
    /// staging area and renamed into place, so readers never observe a
    /// partial file.
    pub fn insert(&self, data: &[u8]) -> io::Result<StoredTask> {
        let digest = compute_hash(data);
        let path = self.path_for(&digest);

        if path.is_file() {
            return Ok(StoredTask {
                digest,
                path,
                written: false,
            });
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = self.staging_path.join(format!("task-{}.part", Uuid::new_v4()));
        write_then_rename(&temp_path, &path, data)?;

        Ok(StoredTask {
            digest,
            path,
            written: true,
        })
    }
}

fn write_then_rename(temp_path: &Path, final_path: &Path, data: &[u8]) -> io::Result<()> {
    let result = (|| -> io::Result<()> {
        let mut file = std::fs::File::create(temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        std::fs::rename(temp_path, final_path)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(temp_path);
    }
    result
}

/// Compute SHA-256 hash of data
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

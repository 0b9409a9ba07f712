//! Result Store

use std::io;
use std::path::PathBuf;

use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::storage::{validate_relative_path, Layout, RESULTS_DIR};

/// Named result files under `results/`
#[derive(Debug, Clone)]
pub struct ResultStore {
    base_path: PathBuf,
    staging_path: PathBuf,
}

impl ResultStore {
    pub fn new(layout: &Layout) -> Self {
        Self {
            base_path: layout.results_dir(),
            staging_path: layout.staging_dir(),
        }
    }

    /// Check that a request path has exactly the shape `results/<name>`.
    ///
    /// Returns the result name. A missing name, extra nesting, a different
    /// first segment, or a name that is not a plain file name yields
    /// [`AppError::Forbidden`].
    pub fn authorize(request_path: &str) -> Result<&str> {
        let path = request_path.strip_prefix('/').unwrap_or(request_path);
        let mut segments = path.split('/');

        match (segments.next(), segments.next(), segments.next()) {
            (Some(RESULTS_DIR), Some(name), None) if validate_relative_path(name).is_ok() => {
                Ok(name)
            }
            _ => {
                tracing::debug!(path = %request_path, "Rejected result write");
                Err(AppError::Forbidden)
            }
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.base_path.join(name)
    }

    /// Write (or overwrite) a result.
    ///
    /// The bytes are staged and renamed into place, so concurrent readers
    /// see either the previous or the new content.
    pub async fn put(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(name);
        let temp_path = self
            .staging_path
            .join(format!("result-{}.part", Uuid::new_v4()));

        if let Err(e) = tokio::fs::write(&temp_path, contents).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&temp_path, &path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        tracing::info!(result = %name, bytes = contents.len(), "Result stored");
        Ok(path)
    }

    /// Read a result by name
    pub async fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(name)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

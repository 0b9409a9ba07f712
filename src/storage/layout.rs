//! On-disk layout of the shared storage root
//!
//! ```text
//! <root>/submit_archives/<job_id>.zip
//! <root>/submits/<job_id>/<relative files>
//! <root>/results/<name>
//! <root>/tasks/<hash[0]>/<hash>
//! <root>/.staging/          (never served)
//! ```

use std::io;
use std::path::{Path, PathBuf};

use crate::jobs::JobId;

use super::paths::validate_relative_path;

// ============================================================================
// Constants
// ============================================================================

/// Finished submission archives
pub const SUBMIT_ARCHIVES_DIR: &str = "submit_archives";

/// Published job directories
pub const SUBMITS_DIR: &str = "submits";

/// Worker-produced result files
pub const RESULTS_DIR: &str = "results";

/// Content-addressed task files
pub const TASKS_DIR: &str = "tasks";

/// Scratch area for jobs and writes that are not yet published
pub const STAGING_DIR: &str = ".staging";

/// Extension of submission archives
pub const ARCHIVE_EXTENSION: &str = "zip";

// ============================================================================
// Layout
// ============================================================================

/// Paths of every subtree under the storage root
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Describe a layout rooted at `root` without touching the filesystem
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root and all of its subtrees
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let layout = Self::new(root);
        for dir in [
            layout.submit_archives_dir(),
            layout.submits_dir(),
            layout.results_dir(),
            layout.tasks_dir(),
            layout.staging_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }

        tracing::debug!(root = %layout.root.display(), "Storage layout ready");
        Ok(layout)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn submit_archives_dir(&self) -> PathBuf {
        self.root.join(SUBMIT_ARCHIVES_DIR)
    }

    pub fn submits_dir(&self) -> PathBuf {
        self.root.join(SUBMITS_DIR)
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join(RESULTS_DIR)
    }

    pub fn tasks_dir(&self) -> PathBuf {
        self.root.join(TASKS_DIR)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    /// Published directory of a job
    pub fn job_dir(&self, id: JobId) -> PathBuf {
        self.submits_dir().join(id.to_string())
    }

    /// Directory a job is materialized in before publication
    pub fn job_staging_dir(&self, id: JobId) -> PathBuf {
        self.staging_dir().join(format!("job-{}", id))
    }

    /// Final archive path of a job
    pub fn archive_path(&self, id: JobId) -> PathBuf {
        self.submit_archives_dir()
            .join(format!("{}.{}", id, ARCHIVE_EXTENSION))
    }

    /// Archive path while it is being written
    pub fn archive_staging_path(&self, id: JobId) -> PathBuf {
        self.staging_dir()
            .join(format!("{}.{}.part", id, ARCHIVE_EXTENSION))
    }

    /// Map a request path onto the root.
    ///
    /// Returns `None` for anything that would leave the root or reach the
    /// staging area.
    pub fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let relative = validate_relative_path(request_path.trim_start_matches('/')).ok()?;
        if relative.starts_with(STAGING_DIR) {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Highest job id already present on disk, published or staged.
    ///
    /// Used to resume the id sequence when the server restarts on a
    /// persistent root.
    pub fn highest_job_id(&self) -> io::Result<u64> {
        let mut highest = 0;

        let sources = [
            (self.submits_dir(), "", ""),
            (self.submit_archives_dir(), "", ".zip"),
            (self.staging_dir(), "job-", ""),
            (self.staging_dir(), "", ".zip.part"),
        ];

        for (dir, prefix, suffix) in sources {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            for entry in entries {
                let name = entry?.file_name();
                let id = name
                    .to_str()
                    .and_then(|n| n.strip_prefix(prefix))
                    .and_then(|n| n.strip_suffix(suffix))
                    .and_then(|n| n.parse::<u64>().ok());
                if let Some(id) = id {
                    highest = highest.max(id);
                }
            }
        }

        Ok(highest)
    }
}

//! Job types

use std::fmt;
use std::path::{Path, PathBuf};

use axum::body::Bytes;

use crate::storage::{validate_relative_path, PathError};

// ============================================================================
// Job Id
// ============================================================================

/// Identifier of a submitted job. Issued in strictly increasing order from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl JobId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Submitted Files
// ============================================================================

/// One file of a submission: a validated relative path and its bytes
#[derive(Debug, Clone)]
pub struct SubmittedFile {
    name: String,
    relative: PathBuf,
    contents: Bytes,
}

impl SubmittedFile {
    /// Validate `name` as a relative path inside the job directory
    pub fn new(name: impl Into<String>, contents: impl Into<Bytes>) -> Result<Self, PathError> {
        let name = name.into();
        let relative = validate_relative_path(&name)?;
        Ok(Self {
            name,
            relative,
            contents: contents.into(),
        })
    }

    /// Name as supplied by the client
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Progress of a job through a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Id assigned, staging directory created
    Created,
    /// Every submitted file written
    FilesWritten,
    /// Archive built from the published directory
    Archived,
    /// Directory and archive retrievable over HTTP
    Available,
}

/// Outcome of a successful submission
#[derive(Debug, Clone)]
pub struct JobReceipt {
    pub id: JobId,
    pub file_count: usize,
    pub total_bytes: u64,
    pub state: JobState,
}

//! Job store
//!
//! Owns the job id counter and the `submits/` tree. Every job directory is
//! scoped by its id, so only id allocation needs synchronization.

use std::io;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::storage::Layout;

use super::archive::build_archive;
use super::counter::JobCounter;
use super::types::{JobId, JobReceipt, JobState, SubmittedFile};

/// Job directories and archives under the storage root
#[derive(Clone)]
pub struct JobStore {
    inner: Arc<JobStoreInner>,
}

struct JobStoreInner {
    layout: Layout,
    counter: JobCounter,
}

impl JobStore {
    /// Open the store, continuing the id sequence after any job already on disk
    pub fn open(layout: Layout) -> io::Result<Self> {
        let last_issued = layout.highest_job_id()?;
        if last_issued > 0 {
            tracing::info!(last_job_id = last_issued, "Resuming job ids after existing submissions");
        }

        Ok(Self {
            inner: Arc::new(JobStoreInner {
                layout,
                counter: JobCounter::resume_after(last_issued),
            }),
        })
    }

    /// Most recently issued job id (0 if none)
    pub fn last_issued(&self) -> u64 {
        self.inner.counter.last_issued()
    }

    /// Store a submission and build its archive.
    ///
    /// The caller must have fully decoded and validated `files`; the id is
    /// consumed as soon as this is called, whether or not it succeeds.
    pub async fn submit(&self, files: Vec<SubmittedFile>) -> Result<JobReceipt> {
        let id = self
            .inner
            .counter
            .next()
            .ok_or_else(|| AppError::Internal("job id space exhausted".to_string()))?;

        match self.materialize(id, &files).await {
            Ok(receipt) => {
                tracing::info!(
                    job_id = %id,
                    files = receipt.file_count,
                    bytes = receipt.total_bytes,
                    "Job submitted"
                );
                Ok(receipt)
            }
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Job submission failed, id is not reused");
                Err(e)
            }
        }
    }

    async fn materialize(&self, id: JobId, files: &[SubmittedFile]) -> Result<JobReceipt> {
        let layout = &self.inner.layout;
        let staging_dir = layout.job_staging_dir(id);

        match tokio::fs::create_dir(&staging_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(AppError::Internal(format!(
                    "job directory for {} already exists",
                    id
                )));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::debug!(job_id = %id, state = ?JobState::Created, "Job directory created");

        let mut total_bytes = 0u64;
        for file in files {
            let target = staging_dir.join(file.relative_path());
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, file.contents()).await?;
            total_bytes += file.contents().len() as u64;
        }
        tracing::debug!(job_id = %id, state = ?JobState::FilesWritten, files = files.len(), "Job files written");

        let job_dir = layout.job_dir(id);
        if tokio::fs::try_exists(&job_dir).await? {
            return Err(AppError::Internal(format!(
                "published directory for job {} already exists",
                id
            )));
        }
        tokio::fs::rename(&staging_dir, &job_dir).await?;

        let summary = build_archive(layout, id).await?;
        tracing::debug!(job_id = %id, state = ?JobState::Archived, archive = %summary.path.display(), "Job archived");

        Ok(JobReceipt {
            id,
            file_count: files.len(),
            total_bytes,
            state: JobState::Available,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn file(name: &str, contents: &str) -> SubmittedFile {
        SubmittedFile::new(name, contents.as_bytes().to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_submit_writes_files_and_archive() {
        let temp_dir = TempDir::new().unwrap();
        let layout = Layout::create(temp_dir.path()).unwrap();
        let store = JobStore::open(layout.clone()).unwrap();

        let receipt = store
            .submit(vec![file("a/b.txt", "hello"), file("c.txt", "world")])
            .await
            .unwrap();

        assert_eq!(receipt.id, JobId::new(1));
        assert_eq!(receipt.file_count, 2);
        assert_eq!(receipt.total_bytes, 10);
        assert_eq!(receipt.state, JobState::Available);

        let job_dir = layout.job_dir(receipt.id);
        assert_eq!(std::fs::read(job_dir.join("a/b.txt")).unwrap(), b"hello");
        assert_eq!(std::fs::read(job_dir.join("c.txt")).unwrap(), b"world");
        assert!(layout.archive_path(receipt.id).is_file());
        assert!(!layout.job_staging_dir(receipt.id).exists());
    }

    #[tokio::test]
    async fn test_ids_increase_across_submissions() {
        let temp_dir = TempDir::new().unwrap();
        let store = JobStore::open(Layout::create(temp_dir.path()).unwrap()).unwrap();

        let first = store.submit(vec![]).await.unwrap();
        let second = store.submit(vec![file("x", "1")]).await.unwrap();

        assert_eq!(first.id.value(), 1);
        assert_eq!(second.id.value(), 2);
        assert_eq!(store.last_issued(), 2);
    }

    #[tokio::test]
    async fn test_failed_submission_consumes_id() {
        let temp_dir = TempDir::new().unwrap();
        let layout = Layout::create(temp_dir.path()).unwrap();
        let store = JobStore::open(layout.clone()).unwrap();

        // A stray directory where job 1 would be staged makes it collide.
        std::fs::create_dir(layout.job_staging_dir(JobId::new(1))).unwrap();
        let result = store.submit(vec![file("a.txt", "a")]).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(!layout.archive_path(JobId::new(1)).exists());

        let next = store.submit(vec![file("a.txt", "a")]).await.unwrap();
        assert_eq!(next.id.value(), 2);
    }

    #[tokio::test]
    async fn test_reopen_resumes_after_existing_jobs() {
        let temp_dir = TempDir::new().unwrap();
        let layout = Layout::create(temp_dir.path()).unwrap();

        let store = JobStore::open(layout.clone()).unwrap();
        store.submit(vec![]).await.unwrap();
        store.submit(vec![]).await.unwrap();

        let reopened = JobStore::open(layout).unwrap();
        let receipt = reopened.submit(vec![]).await.unwrap();
        assert_eq!(receipt.id.value(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_submissions_get_unique_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = JobStore::open(Layout::create(temp_dir.path()).unwrap()).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .submit(vec![SubmittedFile::new("n.txt", format!("{}", i)).unwrap()])
                        .await
                        .unwrap()
                        .id
                        .value()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }

        assert_eq!(ids, (1..=16).collect::<HashSet<u64>>());
    }
}

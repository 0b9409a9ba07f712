//! Task preloader
//!
//! Ingests a directory tree into the task store at startup. Any unreadable
//! file aborts the whole preload; the server must not start half seeded.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use super::store::TaskStore;

/// Startup errors while seeding the task store
#[derive(Error, Debug)]
pub enum PreloadError {
    #[error("task source not found: {0}")]
    SourceMissing(PathBuf),

    #[error("task source is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("failed to walk task source: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("failed to read task file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to store task file {path}: {source}")]
    Store { path: PathBuf, source: io::Error },
}

/// One ingested file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadEntry {
    pub digest: String,
    /// Path relative to the preload source
    pub relative_path: PathBuf,
}

/// Result of a preload run
#[derive(Debug, Clone, Default)]
pub struct PreloadReport {
    pub entries: Vec<PreloadEntry>,
    /// Physical copies created by this run
    pub files_written: usize,
}

impl PreloadReport {
    /// Digest an ingested file was stored under
    pub fn digest_of(&self, relative_path: impl AsRef<Path>) -> Option<&str> {
        let relative_path = relative_path.as_ref();
        self.entries
            .iter()
            .find(|e| e.relative_path == relative_path)
            .map(|e| e.digest.as_str())
    }

    /// Number of distinct contents seen
    pub fn unique_digests(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.digest.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Ingest every regular file under `source` into `store`.
///
/// Emits one `<digest>: <relative path>` line per file so operators can hand
/// the hash list to workers.
pub fn preload(source: &Path, store: &TaskStore) -> Result<PreloadReport, PreloadError> {
    if !source.exists() {
        return Err(PreloadError::SourceMissing(source.to_path_buf()));
    }
    if !source.is_dir() {
        return Err(PreloadError::NotADirectory(source.to_path_buf()));
    }

    tracing::info!(source = %source.display(), "Preloading task files");
    let start = std::time::Instant::now();

    let mut report = PreloadReport::default();

    for entry in WalkDir::new(source)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let data = std::fs::read(path).map_err(|e| PreloadError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        let stored = store.insert(&data).map_err(|e| PreloadError::Store {
            path: path.to_path_buf(),
            source: e,
        })?;

        let relative_path = path.strip_prefix(source).unwrap_or(path).to_path_buf();
        tracing::info!("{}: {}", stored.digest, relative_path.display());

        if stored.written {
            report.files_written += 1;
        }
        report.entries.push(PreloadEntry {
            digest: stored.digest,
            relative_path,
        });
    }

    tracing::info!(
        files = report.entries.len(),
        unique = report.unique_digests(),
        written = report.files_written,
        elapsed = ?start.elapsed(),
        "Task preload complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Layout;
    use tempfile::TempDir;

    fn count_task_files(layout: &Layout) -> usize {
        WalkDir::new(layout.tasks_dir())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .count()
    }

    fn setup() -> (TempDir, TempDir, Layout, TaskStore) {
        let root = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        let layout = Layout::create(root.path()).unwrap();
        let store = TaskStore::new(&layout);
        (root, source, layout, store)
    }

    #[test]
    fn test_distinct_files_retrievable_by_digest() {
        let (_root, source, _layout, store) = setup();
        std::fs::create_dir_all(source.path().join("inputs/deep")).unwrap();
        std::fs::write(source.path().join("a.in"), b"1 2 3").unwrap();
        std::fs::write(source.path().join("inputs/b.in"), b"4 5 6").unwrap();
        std::fs::write(source.path().join("inputs/deep/c.out"), b"\x00\xffbinary").unwrap();

        let report = preload(source.path(), &store).unwrap();
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.files_written, 3);

        for (name, contents) in [
            ("a.in", b"1 2 3".to_vec()),
            ("inputs/b.in", b"4 5 6".to_vec()),
            ("inputs/deep/c.out", b"\x00\xffbinary".to_vec()),
        ] {
            let digest = report.digest_of(name).unwrap();
            assert_eq!(store.read(digest).unwrap(), Some(contents));
        }
    }

    #[test]
    fn test_identical_content_stored_once() {
        let (_root, source, layout, store) = setup();
        std::fs::create_dir(source.path().join("copy")).unwrap();
        std::fs::write(source.path().join("original.txt"), b"same bytes").unwrap();
        std::fs::write(source.path().join("copy/renamed.dat"), b"same bytes").unwrap();

        let report = preload(source.path(), &store).unwrap();
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.unique_digests(), 1);
        assert_eq!(report.files_written, 1);
        assert_eq!(
            report.digest_of("original.txt"),
            report.digest_of("copy/renamed.dat")
        );
        assert_eq!(count_task_files(&layout), 1);
    }

    #[test]
    fn test_repreload_after_rename_adds_nothing() {
        let (_root, source, layout, store) = setup();
        std::fs::write(source.path().join("before.txt"), b"stable").unwrap();
        let first = preload(source.path(), &store).unwrap();

        std::fs::rename(source.path().join("before.txt"), source.path().join("after.txt")).unwrap();
        let second = preload(source.path(), &store).unwrap();

        assert_eq!(second.files_written, 0);
        assert_eq!(second.digest_of("after.txt"), first.digest_of("before.txt"));
        assert_eq!(count_task_files(&layout), 1);
    }

    #[test]
    fn test_empty_source_is_fine() {
        let (_root, source, layout, store) = setup();
        let report = preload(source.path(), &store).unwrap();
        assert!(report.entries.is_empty());
        assert_eq!(count_task_files(&layout), 0);
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let (_root, source, _layout, store) = setup();
        let missing = source.path().join("nope");
        assert!(matches!(
            preload(&missing, &store),
            Err(PreloadError::SourceMissing(_))
        ));

        let file = source.path().join("file.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(matches!(
            preload(&file, &store),
            Err(PreloadError::NotADirectory(_))
        ));
    }
}

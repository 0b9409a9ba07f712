//! Archive builder
//!
//! Packages a published job directory into a ZIP archive whose single
//! top-level entry is a directory named after the job id.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::storage::Layout;

use super::types::JobId;

/// Archive construction errors
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("archive already exists for job {0}")]
    AlreadyExists(JobId),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("archive task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// What went into an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub files: usize,
    pub directories: usize,
}

/// Build the archive of a published job and move it into `submit_archives/`.
///
/// The archive is written into the staging area first, so a GET of the
/// final path returns either nothing or a complete archive. An existing
/// archive for the same job is never replaced.
pub async fn build_archive(layout: &Layout, id: JobId) -> Result<ArchiveSummary, ArchiveError> {
    let job_dir = layout.job_dir(id);
    let staging_path = layout.archive_staging_path(id);
    let final_path = layout.archive_path(id);

    let summary = tokio::task::spawn_blocking(move || -> Result<ArchiveSummary, ArchiveError> {
        if final_path.exists() {
            return Err(ArchiveError::AlreadyExists(id));
        }

        let mut summary = write_archive(&job_dir, id, &staging_path)?;
        std::fs::rename(&staging_path, &final_path)?;
        summary.path = final_path;
        Ok(summary)
    })
    .await??;

    tracing::debug!(
        job_id = %id,
        files = summary.files,
        directories = summary.directories,
        path = %summary.path.display(),
        "Archive built"
    );

    Ok(summary)
}

/// Write `job_dir` as a ZIP archive to `dest`, rooted at `<id>/`.
///
/// Entries are added in sorted order; directories get their own entries so
/// empty subdirectories (and an empty job) survive extraction.
pub fn write_archive(job_dir: &Path, id: JobId, dest: &Path) -> Result<ArchiveSummary, ArchiveError> {
    let root = id.to_string();
    let dir_options = SimpleFileOptions::default();
    let file_options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut zip = ZipWriter::new(BufWriter::new(File::create(dest)?));
    zip.add_directory(format!("{}/", root), dir_options)?;

    let mut files = 0;
    let mut directories = 0;

    for entry in WalkDir::new(job_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(job_dir) else {
            continue;
        };
        let name = entry_name(&root, relative);

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", name), dir_options)?;
            directories += 1;
        } else if entry.file_type().is_file() {
            zip.start_file(name, file_options)?;
            let mut source = File::open(entry.path())?;
            io::copy(&mut source, &mut zip)?;
            files += 1;
        }
    }

    zip.finish()?.flush()?;

    Ok(ArchiveSummary {
        path: dest.to_path_buf(),
        files,
        directories,
    })
}

/// `<root>/<a>/<b>` with forward slashes regardless of platform
fn entry_name(root: &str, relative: &Path) -> String {
    let mut name = root.to_string();
    for component in relative.components() {
        name.push('/');
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> String {
        let mut contents = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        contents
    }

    #[test]
    fn test_archive_keeps_relative_paths() {
        let temp_dir = TempDir::new().unwrap();
        let job_dir = temp_dir.path().join("5");
        std::fs::create_dir_all(job_dir.join("a")).unwrap();
        std::fs::write(job_dir.join("a/b.txt"), b"hello").unwrap();
        std::fs::write(job_dir.join("c.txt"), b"world").unwrap();

        let dest = temp_dir.path().join("5.zip");
        let summary = write_archive(&job_dir, JobId::new(5), &dest).unwrap();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.directories, 1);

        let mut archive = ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        assert!(names.contains(&"5/"));
        assert!(names.contains(&"5/a/"));
        assert!(names.iter().all(|n| n.starts_with("5/")));

        assert_eq!(read_entry(&mut archive, "5/a/b.txt"), "hello");
        assert_eq!(read_entry(&mut archive, "5/c.txt"), "world");
    }

    #[test]
    fn test_empty_job_has_root_directory() {
        let temp_dir = TempDir::new().unwrap();
        let job_dir = temp_dir.path().join("1");
        std::fs::create_dir(&job_dir).unwrap();

        let dest = temp_dir.path().join("1.zip");
        let summary = write_archive(&job_dir, JobId::new(1), &dest).unwrap();
        assert_eq!(summary.files, 0);

        let archive = ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.file_names().next(), Some("1/"));
    }

    #[tokio::test]
    async fn test_build_archive_refuses_rebuild() {
        let temp_dir = TempDir::new().unwrap();
        let layout = Layout::create(temp_dir.path()).unwrap();
        let id = JobId::new(3);
        std::fs::create_dir(layout.job_dir(id)).unwrap();

        let summary = build_archive(&layout, id).await.unwrap();
        assert_eq!(summary.path, layout.archive_path(id));
        assert!(layout.archive_path(id).is_file());
        assert!(!layout.archive_staging_path(id).exists());

        let again = build_archive(&layout, id).await;
        assert!(matches!(again, Err(ArchiveError::AlreadyExists(_))));
    }
}

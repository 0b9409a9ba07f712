//! Job submissions
//!
//! A job is one set of submitted files. Submitting a job:
//! 1. Allocates the next id from the [`JobCounter`]
//! 2. Materializes the files in a private staging directory
//! 3. Publishes the directory under `submits/<id>`
//! 4. Packages it into `submit_archives/<id>.zip`
//!
//! Ids are never reused, even when a later step fails.

pub mod archive;
pub mod counter;
pub mod store;
pub mod types;

pub use archive::{build_archive, write_archive, ArchiveError, ArchiveSummary};
pub use counter::JobCounter;
pub use store::JobStore;
pub use types::*;

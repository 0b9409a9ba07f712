//! Content-addressed task files
//!
//! Task files are static inputs for workers. They are stored once per
//! distinct content under `tasks/<hash[0]>/<hash>` and are immutable after
//! startup. Workers fetch them through the generic GET route.

pub mod preloader;
pub mod store;

pub use preloader::{preload, PreloadEntry, PreloadError, PreloadReport};
pub use store::{compute_hash, StoredTask, TaskStore};

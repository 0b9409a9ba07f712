//! Worker results
//!
//! A flat namespace of named blobs under `results/`, written by workers via
//! PUT and read back by submitters via GET.

mod store;

pub use store::ResultStore;

//! File Exchange Server
//!
//! Distributes files between the submitters and the workers of a remote
//! evaluation pipeline:
//!
//! - `jobs`: submitted file sets, their id sequence and archives
//! - `tasks`: content-addressed task files, seeded at startup
//! - `results`: worker results written through an authorized PUT
//! - `routes`: the HTTP front end over one shared storage root

pub mod config;
pub mod error;
pub mod jobs;
pub mod results;
pub mod routes;
pub mod state;
pub mod storage;
pub mod tasks;

pub use routes::app;

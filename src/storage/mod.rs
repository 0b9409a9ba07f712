//! Storage root management
//!
//! Every resource the server exposes lives under one shared root directory.
//! This module owns the directory layout and the validation applied to
//! every path derived from a request.

mod layout;
mod paths;

pub use layout::*;
pub use paths::*;

//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::jobs::JobStore;
use crate::results::ResultStore;
use crate::storage::Layout;

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to open job store: {0}")]
    JobStore(#[from] std::io::Error),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    layout: Layout,
    jobs: JobStore,
    results: ResultStore,
}

impl AppState {
    /// Create the state over an already created storage layout
    pub fn new(config: Config, layout: Layout) -> Result<Self, StateError> {
        let jobs = JobStore::open(layout.clone())?;
        let results = ResultStore::new(&layout);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                layout,
                jobs,
                results,
            }),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the storage layout
    pub fn layout(&self) -> &Layout {
        &self.inner.layout
    }

    /// Get the job store
    pub fn jobs(&self) -> &JobStore {
        &self.inner.jobs
    }

    /// Get the result store
    pub fn results(&self) -> &ResultStore {
        &self.inner.results
    }
}

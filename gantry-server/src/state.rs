//! Shared application state

use std::sync::Arc;

use crate::cache::StatusCache;
use crate::config::Config;
use crate::store::JobStore;

/// State handed to every request handler. Cheap to clone; the store and
/// cache are the process-wide singletons behind all job and probe state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub cache: Arc<StatusCache>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            store: Arc::new(JobStore::new()),
            cache: Arc::new(StatusCache::new()),
            config: Arc::new(config),
        }
    }
}

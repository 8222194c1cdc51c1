use std::sync::Arc;

use crate::services::query::JobQuery;
use crate::services::runner::JobRunner;
use crate::services::stats::StatsService;
use crate::store::JobStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub runner: Arc<JobRunner>,
    pub query: Arc<JobQuery>,
    pub stats: Arc<StatsService>,
}

impl AppState {
    pub fn new(store: Arc<JobStore>, runner: JobRunner) -> Self {
        Self {
            query: Arc::new(JobQuery::new(store.clone())),
            stats: Arc::new(StatsService::new(store.clone())),
            runner: Arc::new(runner),
            store,
        }
    }
}

pub mod aggregator;
pub mod handler;
pub mod store;
pub mod types;

use crate::config::AnalyticsConfig;
use std::path::PathBuf;
use store::EventStore;

/// Shared state for analytics endpoints.
pub struct AnalyticsState {
    pub store: EventStore,
    pub config: AnalyticsConfig,
}

impl AnalyticsState {
    pub fn new(path: impl Into<PathBuf>, config: AnalyticsConfig) -> Self {
        let store = EventStore::new(path, config.max_entries);
        Self { store, config }
    }
}

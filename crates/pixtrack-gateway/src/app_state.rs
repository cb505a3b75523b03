//! Shared application state for the tracker.
//!
//! Access key, store and metrics are resolved from config once at startup
//! and shared by every request through a cheap `Clone`.

use std::sync::Arc;

use pixtrack_core::access::AccessKey;
use pixtrack_core::error::Result;
use pixtrack_core::store::CounterStore;

use crate::config::TrackerConfig;
use crate::obs::TrackerMetrics;
use crate::storage;

#[derive(Clone)]
pub struct AppState {
    access: Arc<AccessKey>,
    store: Arc<dyn CounterStore>,
    metrics: Arc<TrackerMetrics>,
}

impl AppState {
    /// Build application state, opening the configured store.
    /// Returns Result so main can handle errors gracefully (no panic).
    pub fn new(cfg: TrackerConfig) -> Result<Self> {
        let store = storage::open_store(&cfg.storage)?;
        Ok(Self::with_store(cfg, store))
    }

    /// Build application state around an already-open store.
    pub fn with_store(cfg: TrackerConfig, store: Arc<dyn CounterStore>) -> Self {
        Self {
            access: Arc::new(AccessKey::new(&cfg.tracker.key)),
            store,
            metrics: Arc::new(TrackerMetrics::default()),
        }
    }

    pub fn access(&self) -> &AccessKey {
        &self.access
    }

    pub fn store(&self) -> &dyn CounterStore {
        self.store.as_ref()
    }

    pub fn metrics(&self) -> &TrackerMetrics {
        &self.metrics
    }

    pub fn set_draining(&self) {
        self.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.metrics.is_draining()
    }

    /// Extra gauge lines appended to `/metrics`.
    pub fn metrics_extra(&self) -> Vec<(&'static str, u64)> {
        vec![(
            "pixtrack_access_control_enabled",
            u64::from(self.access().is_enabled()),
        )]
    }
}

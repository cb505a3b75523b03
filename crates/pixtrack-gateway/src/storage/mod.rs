//! Storage backend selection.

pub mod sqlite;

use std::sync::Arc;

use pixtrack_core::error::Result;
use pixtrack_core::store::{CounterStore, MemoryCounterStore};

use crate::config::{StorageBackend, StorageSection};

pub use sqlite::SqliteCounterStore;

/// Build the configured store.
pub fn open_store(cfg: &StorageSection) -> Result<Arc<dyn CounterStore>> {
    tracing::info!(backend = cfg.backend.as_str(), "opening counter store");
    match cfg.backend {
        StorageBackend::Sqlite => Ok(Arc::new(SqliteCounterStore::open(cfg)?)),
        StorageBackend::Memory => {
            tracing::warn!("memory backend selected, counters are lost on restart");
            Ok(Arc::new(MemoryCounterStore::new()))
        }
    }
}

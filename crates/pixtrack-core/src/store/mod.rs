//! Counter store contract.
//!
//! A store owns all mutation logic for the `(event, source) -> count` table.
//! Implementations must keep these invariants even when several processes
//! share the same backing database:
//! - at most one row per key; a lost create race falls back to increment
//! - increments are applied by the store itself, never read-modify-write
//! - `updated_at` is refreshed on every write and never moves backwards

pub mod guard;
pub mod memory;

use async_trait::async_trait;

use crate::counter::{Counter, CounterFilter, CounterKey};
use crate::error::Result;

pub use guard::{record_best_effort, RecordOutcome};
pub use memory::MemoryCounterStore;

/// What `record_hit` did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// First sight of the key; row created with count 1.
    Created,
    /// Existing row incremented by 1.
    Incremented,
    /// Key had no event; nothing written.
    Skipped,
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Short backend name for logs and metrics.
    fn backend(&self) -> &'static str;

    /// Find-or-create the row for `key`, then count one hit.
    async fn record_hit(&self, key: &CounterKey) -> Result<HitOutcome>;

    /// Increment-only path. Returns `false` when no row matched.
    async fn increment(&self, key: &CounterKey) -> Result<bool>;

    /// Rows matching `filter`, count descending, at most `filter.effective_limit()`.
    async fn list_counters(&self, filter: &CounterFilter) -> Result<Vec<Counter>>;

    /// Set count to 0 for the given keys. Returns the number of rows touched.
    async fn reset_counters(&self, keys: &[CounterKey]) -> Result<u64>;

    /// Add 1 to the given existing keys. Returns the number of rows touched.
    async fn bump_counters(&self, keys: &[CounterKey]) -> Result<u64>;

    /// Cheap reachability check backing `/readyz`.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Deduplicate and drop keys without an event, for batch admin updates.
pub fn batch_keys(keys: &[CounterKey]) -> Vec<CounterKey> {
    let mut out: Vec<CounterKey> = keys.iter().filter(|k| k.is_recordable()).cloned().collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_keys_dedups_and_skips_empty_events() {
        let keys = [
            CounterKey::new("b", ""),
            CounterKey::new("a", "x"),
            CounterKey::new("", "x"),
            CounterKey::new("b", ""),
        ];
        assert_eq!(
            batch_keys(&keys),
            vec![CounterKey::new("a", "x"), CounterKey::new("b", "")]
        );
    }
}

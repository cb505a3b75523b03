//! In-process counter store backed by `DashMap`.
//!
//! The map entry API holds the shard lock across the vacant check and the
//! insert, which gives the same "exactly one row" guarantee the SQL unique
//! constraint gives. Counts and timestamps are atomics, so concurrent hits on
//! an existing key never lose an update.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::counter::{
    datetime_from_millis, now_millis, sort_for_listing, Counter, CounterFilter, CounterKey,
};
use crate::error::Result;
use crate::store::{batch_keys, CounterStore, HitOutcome};

struct CounterCell {
    count: AtomicU64,
    updated_at_ms: AtomicI64,
}

impl CounterCell {
    fn new(count: u64, now_ms: i64) -> Self {
        Self {
            count: AtomicU64::new(count),
            updated_at_ms: AtomicI64::new(now_ms),
        }
    }

    fn add(&self, v: u64, now_ms: i64) {
        self.count.fetch_add(v, Ordering::Relaxed);
        self.updated_at_ms.fetch_max(now_ms, Ordering::Relaxed);
    }

    fn reset(&self, now_ms: i64) {
        self.count.store(0, Ordering::Relaxed);
        self.updated_at_ms.fetch_max(now_ms, Ordering::Relaxed);
    }
}

#[derive(Default)]
pub struct MemoryCounterStore {
    cells: DashMap<CounterKey, CounterCell>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self {
            cells: DashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Seed a row with an explicit count. Test and fixture helper.
    pub fn insert(&self, key: CounterKey, count: u64) {
        self.cells.insert(key, CounterCell::new(count, now_millis()));
    }

    fn add_existing(&self, key: &CounterKey, now_ms: i64) -> bool {
        match self.cells.get(key) {
            Some(cell) => {
                cell.add(1, now_ms);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn record_hit(&self, key: &CounterKey) -> Result<HitOutcome> {
        if !key.is_recordable() {
            return Ok(HitOutcome::Skipped);
        }
        let now_ms = now_millis();

        // Hot path: shared shard lock only.
        if self.add_existing(key, now_ms) {
            return Ok(HitOutcome::Incremented);
        }

        match self.cells.entry(key.clone()) {
            Entry::Vacant(v) => {
                v.insert(CounterCell::new(1, now_ms));
                Ok(HitOutcome::Created)
            }
            // Lost the create race.
            Entry::Occupied(o) => {
                o.get().add(1, now_ms);
                Ok(HitOutcome::Incremented)
            }
        }
    }

    async fn increment(&self, key: &CounterKey) -> Result<bool> {
        Ok(self.add_existing(key, now_millis()))
    }

    async fn list_counters(&self, filter: &CounterFilter) -> Result<Vec<Counter>> {
        let mut rows = Vec::new();
        for r in self.cells.iter() {
            let key = r.key();
            if !filter.matches(&key.event, &key.source) {
                continue;
            }
            let cell = r.value();
            rows.push(Counter {
                event: key.event.clone(),
                source: key.source.clone(),
                count: cell.count.load(Ordering::Relaxed),
                updated_at: datetime_from_millis(cell.updated_at_ms.load(Ordering::Relaxed))?,
            });
        }
        sort_for_listing(&mut rows);
        rows.truncate(filter.effective_limit());
        Ok(rows)
    }

    async fn reset_counters(&self, keys: &[CounterKey]) -> Result<u64> {
        let now_ms = now_millis();
        let mut affected = 0;
        for key in batch_keys(keys) {
            if let Some(cell) = self.cells.get(&key) {
                cell.reset(now_ms);
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn bump_counters(&self, keys: &[CounterKey]) -> Result<u64> {
        let now_ms = now_millis();
        let mut affected = 0;
        for key in batch_keys(keys) {
            if self.add_existing(&key, now_ms) {
                affected += 1;
            }
        }
        Ok(affected)
    }
}

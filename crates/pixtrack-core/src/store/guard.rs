//! Best-effort hit recording for the tracking path.
//!
//! A failed `record_hit` is retried exactly once through the increment-only
//! path. If that also fails the hit is logged and dropped; the caller always
//! gets an outcome, never an error.

use crate::counter::CounterKey;
use crate::store::{CounterStore, HitOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First attempt succeeded.
    Recorded(HitOutcome),
    /// First attempt failed, the increment-only retry landed.
    Retried,
    /// Both attempts failed (or the retry found no row); hit lost.
    Dropped,
}

impl RecordOutcome {
    pub fn is_counted(self) -> bool {
        matches!(
            self,
            RecordOutcome::Recorded(HitOutcome::Created | HitOutcome::Incremented)
                | RecordOutcome::Retried
        )
    }
}

pub async fn record_best_effort(store: &dyn CounterStore, key: &CounterKey) -> RecordOutcome {
    let first = match store.record_hit(key).await {
        Ok(outcome) => return RecordOutcome::Recorded(outcome),
        Err(e) => e,
    };

    tracing::warn!(
        backend = store.backend(),
        event = %key.event,
        source = %key.source,
        failure = first.store_failure().map(|f| f.as_str()).unwrap_or("n/a"),
        error = %first,
        "record_hit failed, retrying as increment"
    );

    match store.increment(key).await {
        Ok(true) => RecordOutcome::Retried,
        Ok(false) => {
            tracing::error!(
                backend = store.backend(),
                event = %key.event,
                source = %key.source,
                "increment retry matched no row, hit dropped"
            );
            RecordOutcome::Dropped
        }
        Err(second) => {
            tracing::error!(
                backend = store.backend(),
                event = %key.event,
                source = %key.source,
                error = %second,
                "increment retry failed, hit dropped"
            );
            RecordOutcome::Dropped
        }
    }
}

//! Tracking pixel: `GET /t.gif?e=<event>&src=<source>&k=<key>`.
//!
//! Always 200 with the same GIF and no-cache headers. A wrong key, an empty
//! event, an unparseable query and a failing store all look identical to the
//! caller.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use pixtrack_core::counter::CounterKey;
use pixtrack_core::pixel::{PIXEL_CACHE_CONTROL, PIXEL_CONTENT_TYPE, PIXEL_GIF};
use pixtrack_core::store::{record_best_effort, RecordOutcome};

use crate::app_state::AppState;
use crate::http::query::{QueryParams, RawQuery};

#[derive(Debug, Default)]
pub struct PixelQuery {
    pub e: Option<String>,
    pub src: Option<String>,
    pub k: Option<String>,
}

impl PixelQuery {
    pub fn from_params(params: &QueryParams) -> Self {
        Self {
            e: params.get("e").map(str::to_string),
            src: params.get("src").map(str::to_string),
            k: params.get("k").map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelOutcome {
    Recorded,
    SkippedKey,
    SkippedEmpty,
    Failed,
}

impl PixelOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            PixelOutcome::Recorded => "recorded",
            PixelOutcome::SkippedKey => "skipped_key",
            PixelOutcome::SkippedEmpty => "skipped_empty",
            PixelOutcome::Failed => "failed",
        }
    }
}

pub async fn pixel(
    State(state): State<AppState>,
    query: RawQuery,
) -> Response {
    let q = match query {
        Ok(Query(pairs)) => PixelQuery::from_params(&QueryParams::from_pairs(pairs)),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "unparseable pixel query, treated as empty");
            PixelQuery::default()
        }
    };

    let outcome = track(&state, &q).await;
    state
        .metrics()
        .pixel_requests
        .inc(&[("outcome", outcome.as_str())]);

    pixel_response()
}

/// Key check, sanitize, best-effort record. Never fails.
async fn track(state: &AppState, q: &PixelQuery) -> PixelOutcome {
    if !state.access().permits(q.k.as_deref()) {
        tracing::debug!(reason = "key", "pixel hit skipped");
        return PixelOutcome::SkippedKey;
    }

    let key = CounterKey::from_raw(q.e.as_deref(), q.src.as_deref());
    if !key.is_recordable() {
        tracing::debug!(reason = "empty_event", "pixel hit skipped");
        return PixelOutcome::SkippedEmpty;
    }

    let started = Instant::now();
    let outcome = record_best_effort(state.store(), &key).await;
    state
        .metrics()
        .store_duration
        .observe(&[("op", "record_hit")], started.elapsed());

    match outcome {
        RecordOutcome::Recorded(_) => PixelOutcome::Recorded,
        RecordOutcome::Retried => {
            state.metrics().record_retries.inc(&[]);
            PixelOutcome::Recorded
        }
        RecordOutcome::Dropped => {
            state.metrics().record_retries.inc(&[]);
            PixelOutcome::Failed
        }
    }
}

pub fn pixel_response() -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, PIXEL_CONTENT_TYPE),
            (header::CACHE_CONTROL, PIXEL_CACHE_CONTROL),
        ],
        PIXEL_GIF,
    )
        .into_response()
}

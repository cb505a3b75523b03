//! Stats read API: `GET /api/stats?src=<source>&e=<event>&k=<key>`.
//!
//! Unlike the pixel, this path is honest about rejection: a wrong key gets a
//! 403 with `{"detail": "Forbidden"}`.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use pixtrack_core::counter::{Counter, CounterFilter};
use pixtrack_core::error::{Result as CoreResult, TrackerError};

use crate::app_state::AppState;
use crate::http::query::{QueryParams, RawQuery};
use crate::http::ApiError;

#[derive(Debug, Default)]
pub struct StatsQuery {
    pub src: Option<String>,
    pub e: Option<String>,
    pub k: Option<String>,
}

impl StatsQuery {
    pub fn from_params(params: &QueryParams) -> Self {
        Self {
            src: params.get("src").map(str::to_string),
            e: params.get("e").map(str::to_string),
            k: params.get("k").map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatsItem {
    pub event: String,
    pub src: String,
    pub count: u64,
    pub updated_at: String,
}

impl StatsItem {
    fn from_counter(c: Counter) -> CoreResult<Self> {
        let updated_at = c.updated_at_rfc3339()?;
        Ok(Self {
            event: c.event,
            src: c.source,
            count: c.count,
            updated_at,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub items: Vec<StatsItem>,
}

pub async fn stats(
    State(state): State<AppState>,
    query: RawQuery,
) -> Response {
    let res = list(&state, query).await;
    let status = match &res {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status(),
    };
    state
        .metrics()
        .stats_requests
        .inc(&[("status", status.as_str())]);
    res.into_response()
}

async fn list(
    state: &AppState,
    query: RawQuery,
) -> Result<Json<StatsResponse>, ApiError> {
    let q = match query {
        Ok(Query(pairs)) => StatsQuery::from_params(&QueryParams::from_pairs(pairs)),
        // Without a parsed key we cannot grant access.
        Err(_) if state.access().is_enabled() => return Err(ApiError::forbidden()),
        Err(rejection) => {
            return Err(TrackerError::BadRequest(format!("invalid query: {rejection}")).into())
        }
    };

    if !state.access().permits(q.k.as_deref()) {
        return Err(ApiError::forbidden());
    }

    let filter = CounterFilter::from_raw(q.src.as_deref(), q.e.as_deref());

    let started = Instant::now();
    let rows = state.store().list_counters(&filter).await;
    state
        .metrics()
        .store_duration
        .observe(&[("op", "list_counters")], started.elapsed());

    let items = rows?
        .into_iter()
        .map(StatsItem::from_counter)
        .collect::<CoreResult<Vec<_>>>()?;
    Ok(Json(StatsResponse { items }))
}

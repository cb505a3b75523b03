//! Admin batch updates over selected counters.
//!
//! - `POST /api/admin/reset?k=<key>` : count = 0
//! - `POST /api/admin/bump?k=<key>`  : count = count + 1 (test hit)
//!
//! Body: `{"items": [{"event": "...", "src": "..."}]}`. Response:
//! `{"affected": n}`.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use pixtrack_core::counter::{CounterKey, LIST_LIMIT};
use pixtrack_core::error::TrackerError;

use crate::app_state::AppState;
use crate::http::query::{QueryParams, RawQuery};
use crate::http::ApiError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminRequest {
    pub items: Vec<AdminItem>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminItem {
    pub event: String,
    #[serde(default)]
    pub src: String,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub affected: u64,
}

#[derive(Debug, Clone, Copy)]
enum AdminAction {
    Reset,
    Bump,
}

impl AdminAction {
    fn as_str(self) -> &'static str {
        match self {
            AdminAction::Reset => "reset",
            AdminAction::Bump => "bump",
        }
    }
}

pub async fn reset(
    State(state): State<AppState>,
    query: RawQuery,
    body: Result<Json<AdminRequest>, JsonRejection>,
) -> Response {
    handle(&state, AdminAction::Reset, query, body).await
}

pub async fn bump(
    State(state): State<AppState>,
    query: RawQuery,
    body: Result<Json<AdminRequest>, JsonRejection>,
) -> Response {
    handle(&state, AdminAction::Bump, query, body).await
}

async fn handle(
    state: &AppState,
    action: AdminAction,
    query: RawQuery,
    body: Result<Json<AdminRequest>, JsonRejection>,
) -> Response {
    let res = apply(state, action, query, body).await;
    let status = match &res {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status(),
    };
    state
        .metrics()
        .admin_requests
        .inc(&[("action", action.as_str()), ("status", status.as_str())]);
    res.into_response()
}

async fn apply(
    state: &AppState,
    action: AdminAction,
    query: RawQuery,
    body: Result<Json<AdminRequest>, JsonRejection>,
) -> Result<Json<AdminResponse>, ApiError> {
    let params = query
        .map(|Query(pairs)| QueryParams::from_pairs(pairs))
        .unwrap_or_default();
    if !state.access().permits(params.get("k")) {
        return Err(ApiError::forbidden());
    }

    let Json(req) = body
        .map_err(|rejection| TrackerError::BadRequest(format!("invalid body: {rejection}")))?;
    if req.items.len() > LIST_LIMIT {
        return Err(TrackerError::BadRequest(format!(
            "at most {LIST_LIMIT} items per request"
        ))
        .into());
    }

    let keys: Vec<CounterKey> = req
        .items
        .iter()
        .map(|item| CounterKey::from_raw(Some(&item.event), Some(&item.src)))
        .collect();

    let started = Instant::now();
    let affected = match action {
        AdminAction::Reset => state.store().reset_counters(&keys).await?,
        AdminAction::Bump => state.store().bump_counters(&keys).await?,
    };
    state
        .metrics()
        .store_duration
        .observe(&[("op", action.as_str())], started.elapsed());

    tracing::info!(action = action.as_str(), requested = keys.len(), affected, "admin update applied");
    Ok(Json(AdminResponse { affected }))
}

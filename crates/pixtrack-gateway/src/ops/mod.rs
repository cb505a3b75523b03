//! Operational HTTP endpoints.
//!
//! - `/healthz` : process is up
//! - `/readyz`  : 503 while draining or when the counter store does not answer
//! - `/metrics` : Prometheus text format

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.is_draining() {
        return (StatusCode::SERVICE_UNAVAILABLE, "draining");
    }
    match state.store().ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(backend = state.store().backend(), error = %e, "store ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
        }
    }
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let body = state.metrics().render(&state.metrics_extra());
    ([(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)], body).into_response()
}

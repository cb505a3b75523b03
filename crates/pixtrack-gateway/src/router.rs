//! Axum router wiring.
//!
//! Method routing gives every path a 405 for methods it does not list. The
//! public GET routes also refuse HEAD so prefetchers cannot count hits.

use axum::{
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, http, ops};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/t.gif", get(http::pixel::pixel).head(http::get_only))
        .route("/api/stats", get(http::stats::stats).head(http::get_only))
        .route("/api/admin/reset", post(http::admin::reset))
        .route("/api/admin/bump", post(http::admin::bump))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}

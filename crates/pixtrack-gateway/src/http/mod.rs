//! HTTP surface: tracking pixel, stats read API, admin batch updates.

pub mod admin;
pub mod error;
pub mod pixel;
pub mod query;
pub mod stats;

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};

pub use error::ApiError;

/// Explicit 405 for HEAD on GET-only routes; axum would otherwise run the
/// GET handler for it.
pub async fn get_only() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, [(header::ALLOW, "GET")])
}

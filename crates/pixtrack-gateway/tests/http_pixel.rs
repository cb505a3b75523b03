#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, StatusCode};

use pixtrack_core::counter::{Counter, CounterFilter, CounterKey};
use pixtrack_core::error::{Result, StoreFailure, TrackerError};
use pixtrack_core::pixel::PIXEL_GIF;
use pixtrack_core::store::{CounterStore, HitOutcome};

use common::{body_bytes, get, memory_app, send, store_app};

async fn assert_pixel(resp: axum::http::Response<axum::body::Body>) {
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/gif");
    assert_eq!(
        resp.headers()[header::CACHE_CONTROL],
        "no-store, no-cache, must-revalidate, max-age=0"
    );
    assert_eq!(body_bytes(resp).await, PIXEL_GIF);
}

fn row(event: &str, source: &str, count: u64) -> (String, String, u64) {
    (event.to_string(), source.to_string(), count)
}

async fn rows(store: &dyn CounterStore) -> Vec<(String, String, u64)> {
    store
        .list_counters(&CounterFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|c| (c.event, c.source, c.count))
        .collect()
}

#[tokio::test]
async fn two_hits_make_one_row_with_count_two() {
    let (app, _, store) = memory_app("");
    assert_pixel(get(&app, "/t.gif?e=signup&src=landing").await).await;
    assert_pixel(get(&app, "/t.gif?e=signup&src=landing").await).await;

    assert_eq!(rows(store.as_ref()).await, vec![row("signup", "landing", 2)]);
}

#[tokio::test]
async fn wrong_key_still_serves_pixel_but_records_nothing() {
    let (app, state, store) = memory_app("abc");

    assert_pixel(get(&app, "/t.gif?e=signup&k=wrong").await).await;
    assert_pixel(get(&app, "/t.gif?e=signup").await).await;
    assert!(store.is_empty());

    assert_pixel(get(&app, "/t.gif?e=signup&k=abc").await).await;
    assert_eq!(rows(store.as_ref()).await, vec![row("signup", "", 1)]);

    let m = &state.metrics().pixel_requests;
    assert_eq!(m.get(&[("outcome", "skipped_key")]), 2);
    assert_eq!(m.get(&[("outcome", "recorded")]), 1);
}

#[tokio::test]
async fn empty_or_missing_event_is_a_silent_noop() {
    let (app, state, store) = memory_app("");
    for uri in ["/t.gif", "/t.gif?e=", "/t.gif?e=%20%20&src=landing", "/t.gif?src=x"] {
        assert_pixel(get(&app, uri).await).await;
    }
    assert!(store.is_empty());
    assert_eq!(
        state.metrics().pixel_requests.get(&[("outcome", "skipped_empty")]),
        4
    );
}

#[tokio::test]
async fn values_are_trimmed_and_truncated() {
    let (app, _, store) = memory_app("");
    let long = "x".repeat(300);
    let uri = format!("/t.gif?e=%20signup%20&src={long}");
    assert_pixel(get(&app, &uri).await).await;

    let got = rows(store.as_ref()).await;
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].0, "signup");
    assert_eq!(got[0].1, "x".repeat(120));
}

#[tokio::test]
async fn repeated_parameters_keep_the_last_value() {
    let (app, _, store) = memory_app("abc");
    assert_pixel(get(&app, "/t.gif?e=signup&k=abc&k=abc").await).await;
    assert_pixel(get(&app, "/t.gif?e=a&e=b&k=abc").await).await;
    assert_pixel(get(&app, "/t.gif?e=c&k=abc&k=wrong").await).await;

    let mut got = rows(store.as_ref()).await;
    got.sort();
    assert_eq!(got, vec![row("b", "", 1), row("signup", "", 1)]);
}

#[tokio::test]
async fn non_get_methods_are_rejected() {
    let (app, _, store) = memory_app("");
    for method in ["HEAD", "POST", "PUT", "DELETE"] {
        let resp = send(&app, method, "/t.gif?e=signup", None).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn head_does_not_count_a_hit() {
    let (app, state, store) = memory_app("");
    let resp = send(&app, "HEAD", "/t.gif?e=signup&src=prefetch", None).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()[header::ALLOW], "GET");
    assert!(store.is_empty());
    assert_eq!(state.metrics().pixel_requests.get(&[("outcome", "recorded")]), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_lose_no_hits() {
    let (app, _, store) = memory_app("");
    let mut tasks = Vec::new();
    for _ in 0..200 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            get(&app, "/t.gif?e=burst&src=load").await.status()
        }));
    }
    for t in tasks {
        assert_eq!(t.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(rows(store.as_ref()).await, vec![row("burst", "load", 200)]);
}

/// Every write fails; listing is empty.
struct BrokenStore;

#[async_trait]
impl CounterStore for BrokenStore {
    fn backend(&self) -> &'static str {
        "broken"
    }
    async fn record_hit(&self, _key: &CounterKey) -> Result<HitOutcome> {
        Err(TrackerError::storage(StoreFailure::Busy, "database is locked"))
    }
    async fn increment(&self, _key: &CounterKey) -> Result<bool> {
        Err(TrackerError::storage(StoreFailure::Busy, "database is locked"))
    }
    async fn list_counters(&self, _filter: &CounterFilter) -> Result<Vec<Counter>> {
        Err(TrackerError::storage(StoreFailure::Other, "disk I/O error"))
    }
    async fn reset_counters(&self, _keys: &[CounterKey]) -> Result<u64> {
        Err(TrackerError::storage(StoreFailure::Other, "disk I/O error"))
    }
    async fn bump_counters(&self, _keys: &[CounterKey]) -> Result<u64> {
        Err(TrackerError::storage(StoreFailure::Other, "disk I/O error"))
    }
}

#[tokio::test]
async fn store_failure_never_reaches_the_pixel_response() {
    let (app, state) = store_app("", Arc::new(BrokenStore));
    assert_pixel(get(&app, "/t.gif?e=signup").await).await;

    assert_eq!(state.metrics().pixel_requests.get(&[("outcome", "failed")]), 1);
    assert_eq!(state.metrics().record_retries.get(&[]), 1);
}

#[tokio::test]
async fn store_failure_on_stats_is_a_500_without_internals() {
    let (app, _) = store_app("", Arc::new(BrokenStore));
    let resp = get(&app, "/api/stats").await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = common::body_json(resp).await;
    assert_eq!(body["detail"], "Internal Server Error");
}

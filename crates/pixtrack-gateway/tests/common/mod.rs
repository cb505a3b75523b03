//! Shared helpers for gateway integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use tower::ServiceExt;

use pixtrack_core::store::{CounterStore, MemoryCounterStore};
use pixtrack_gateway::app_state::AppState;
use pixtrack_gateway::config::{self, StorageBackend, StorageSection, TrackerConfig};
use pixtrack_gateway::router::build_router;

/// Config with the given shared key and a memory backend.
pub fn config_with_key(key: &str) -> TrackerConfig {
    let mut cfg = config::load_from_str("version: 1\nstorage:\n  backend: memory\n").unwrap();
    cfg.tracker.key = key.to_string();
    cfg
}

pub fn memory_app(key: &str) -> (Router, AppState, Arc<MemoryCounterStore>) {
    let store = Arc::new(MemoryCounterStore::new());
    let state = AppState::with_store(config_with_key(key), store.clone() as Arc<dyn CounterStore>);
    (build_router(state.clone()), state, store)
}

pub fn store_app(key: &str, store: Arc<dyn CounterStore>) -> (Router, AppState) {
    let state = AppState::with_store(config_with_key(key), store);
    (build_router(state.clone()), state)
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> Response<Body> {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            req = req.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone().oneshot(req.body(body).unwrap()).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, "GET", uri, None).await
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

/// A sqlite database file path unique to this test run.
pub struct TempDb {
    pub path: PathBuf,
}

impl TempDb {
    pub fn new(name: &str) -> Self {
        static SEQ: AtomicUsize = AtomicUsize::new(0);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = SEQ.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "pixtrack-{name}-{}-{nanos}-{seq}.db",
            std::process::id()
        ));
        Self { path }
    }

    pub fn section(&self, pool_size: usize) -> StorageSection {
        StorageSection {
            backend: StorageBackend::Sqlite,
            path: self.path.to_string_lossy().into_owned(),
            pool_size,
            busy_timeout_ms: 10_000,
        }
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut p = self.path.clone().into_os_string();
            p.push(suffix);
            let _ = std::fs::remove_file(p);
        }
    }
}

//! pixtrack gateway library entry.
//!
//! This crate wires config, storage, the HTTP handlers and the ops endpoints
//! into one axum service. It is intended to be consumed by the binary
//! (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod http;
pub mod obs;
pub mod ops;
pub mod router;
pub mod storage;

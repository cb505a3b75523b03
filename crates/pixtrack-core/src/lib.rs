//! pixtrack core: counter model, store contract, and error types.
//!
//! This crate defines the domain shared by the gateway and its storage
//! backends: the `(event, source)` counter, field sanitizing, the shared-secret
//! check, and the `CounterStore` trait with its in-memory implementation. It
//! carries no HTTP or database dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `TrackerError`/`Result` so a bad request
//! or a failing store can never take the process down.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod access;
pub mod counter;
pub mod error;
pub mod pixel;
pub mod store;

/// Shared result type.
pub use error::{Result, StoreFailure, TrackerError};

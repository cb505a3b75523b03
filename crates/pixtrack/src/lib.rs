//! Top-level facade crate for pixtrack.
//!
//! Re-exports the core domain and the gateway library so users can depend on a single crate.

pub mod core {
    pub use pixtrack_core::*;
}

pub mod gateway {
    pub use pixtrack_gateway::*;
}

//! Shared error type across pixtrack crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Access key missing or wrong.
    Forbidden,
    /// Backing store failed.
    Storage,
    /// Invalid configuration.
    Config,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Forbidden => "FORBIDDEN",
            ClientCode::Storage => "STORAGE",
            ClientCode::Config => "CONFIG",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Rough classification of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    /// Uniqueness or check constraint rejected the write.
    Conflict,
    /// Database locked or busy past the configured timeout.
    Busy,
    /// Anything else (I/O, corrupt row, poisoned connection).
    Other,
}

impl StoreFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreFailure::Conflict => "conflict",
            StoreFailure::Busy => "busy",
            StoreFailure::Other => "other",
        }
    }
}

impl std::fmt::Display for StoreFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Unified error type used by core, stores and gateway.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("forbidden")]
    Forbidden,
    #[error("storage ({kind}): {message}")]
    Storage { kind: StoreFailure, message: String },
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl TrackerError {
    /// Build a storage error from any displayable cause.
    pub fn storage(kind: StoreFailure, cause: impl std::fmt::Display) -> Self {
        TrackerError::Storage {
            kind,
            message: cause.to_string(),
        }
    }

    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            TrackerError::BadRequest(_) => ClientCode::BadRequest,
            TrackerError::Forbidden => ClientCode::Forbidden,
            TrackerError::Storage { .. } => ClientCode::Storage,
            TrackerError::Config(_) => ClientCode::Config,
            TrackerError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Failure class for storage errors, `None` for everything else.
    pub fn store_failure(&self) -> Option<StoreFailure> {
        match self {
            TrackerError::Storage { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

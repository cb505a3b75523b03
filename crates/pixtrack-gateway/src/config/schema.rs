use std::net::SocketAddr;

use serde::Deserialize;
use pixtrack_core::error::{Result, TrackerError};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub tracker: TrackerSection,

    #[serde(default)]
    pub storage: StorageSection,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            tracker: TrackerSection::default(),
            storage: StorageSection::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TrackerError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.storage.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|_| {
            TrackerError::Config(format!(
                "server.listen must be a valid socket address, got {:?}",
                self.listen
            ))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrackerSection {
    /// Shared secret. Empty disables access control.
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_path(),
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StorageSection {
    pub fn validate(&self) -> Result<()> {
        if self.backend == StorageBackend::Sqlite && self.path.trim().is_empty() {
            return Err(TrackerError::Config(
                "storage.path must not be empty for the sqlite backend".into(),
            ));
        }
        if !(1..=64).contains(&self.pool_size) {
            return Err(TrackerError::Config(
                "storage.pool_size must be between 1 and 64".into(),
            ));
        }
        if self.busy_timeout_ms > 60_000 {
            return Err(TrackerError::Config(
                "storage.busy_timeout_ms must be at most 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_path() -> String {
    "pixtrack.db".into()
}
fn default_pool_size() -> usize {
    4
}
fn default_busy_timeout_ms() -> u64 {
    5000
}

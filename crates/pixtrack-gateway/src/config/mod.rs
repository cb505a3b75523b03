//! Config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use pixtrack_core::error::{Result, TrackerError};

pub use schema::{ServerSection, StorageBackend, StorageSection, TrackerConfig, TrackerSection};

/// Used when `PIXTRACK_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "pixtrack.yaml";

/// Environment variable that overrides `tracker.key`.
pub const TRACKER_KEY_ENV: &str = "TRACKER_KEY";

pub fn load_from_file(path: &str) -> Result<TrackerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| TrackerError::Config(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<TrackerConfig> {
    let cfg: TrackerConfig = serde_yaml::from_str(s)
        .map_err(|e| TrackerError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the startup config.
///
/// An explicit path must exist. Without one, `pixtrack.yaml` is used when
/// present and built-in defaults otherwise.
pub fn load(explicit: Option<&str>) -> Result<TrackerConfig> {
    match explicit {
        Some(path) => load_from_file(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => load_from_file(DEFAULT_CONFIG_PATH),
        None => {
            tracing::warn!(path = DEFAULT_CONFIG_PATH, "config file not found, using defaults");
            let cfg = TrackerConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

/// Apply environment overrides. `lookup` is `std::env::var` in production.
pub fn apply_env_overrides<F>(cfg: &mut TrackerConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(TRACKER_KEY_ENV) {
        cfg.tracker.key = key;
    }
}

//! Counter model: the `(event, source)` key, stored rows, and list filters.
//!
//! Incoming query values are untrusted. `clean_field` is the single place that
//! turns them into key material: trim, blank to empty, cap at
//! [`MAX_FIELD_CHARS`] characters.

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::{Result, TrackerError};

/// Maximum length of `event` and `source`, in characters.
pub const MAX_FIELD_CHARS: usize = 120;

/// Hard cap on rows returned by a single listing.
pub const LIST_LIMIT: usize = 500;

/// Trim, treat missing/blank as empty, truncate to [`MAX_FIELD_CHARS`].
pub fn clean_field(raw: Option<&str>) -> String {
    let trimmed = raw.unwrap_or_default().trim();
    trimmed.chars().take(MAX_FIELD_CHARS).collect()
}

/// Unique identity of a counter row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CounterKey {
    pub event: String,
    /// Empty string means unscoped.
    pub source: String,
}

impl CounterKey {
    /// Build a key from already-clean values.
    pub fn new(event: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            source: source.into(),
        }
    }

    /// Build a key from raw request values.
    pub fn from_raw(event: Option<&str>, source: Option<&str>) -> Self {
        Self {
            event: clean_field(event),
            source: clean_field(source),
        }
    }

    /// `event` is the only required dimension.
    pub fn is_recordable(&self) -> bool {
        !self.event.is_empty()
    }
}

/// A stored counter row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counter {
    pub event: String,
    pub source: String,
    pub count: u64,
    pub updated_at: OffsetDateTime,
}

impl Counter {
    pub fn key(&self) -> CounterKey {
        CounterKey::new(self.event.clone(), self.source.clone())
    }

    /// `updated_at` as an RFC 3339 (ISO-8601) string.
    pub fn updated_at_rfc3339(&self) -> Result<String> {
        self.updated_at
            .format(&Rfc3339)
            .map_err(|e| TrackerError::Internal(format!("format updated_at failed: {e}")))
    }
}

/// Listing filter. Empty fields mean "no restriction".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterFilter {
    pub source: Option<String>,
    pub event: Option<String>,
    pub limit: usize,
}

impl Default for CounterFilter {
    fn default() -> Self {
        Self {
            source: None,
            event: None,
            limit: LIST_LIMIT,
        }
    }
}

impl CounterFilter {
    /// Build a filter from raw request values; blank values drop the restriction.
    pub fn from_raw(source: Option<&str>, event: Option<&str>) -> Self {
        let non_empty = |raw: Option<&str>| Some(clean_field(raw)).filter(|s| !s.is_empty());
        Self {
            source: non_empty(source),
            event: non_empty(event),
            limit: LIST_LIMIT,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Requested limit, never above [`LIST_LIMIT`].
    pub fn effective_limit(&self) -> usize {
        self.limit.min(LIST_LIMIT)
    }

    pub fn matches(&self, event: &str, source: &str) -> bool {
        self.source.as_deref().map_or(true, |s| s == source)
            && self.event.as_deref().map_or(true, |e| e == event)
    }
}

/// Listing order: count descending, then event and source ascending.
pub fn sort_for_listing(rows: &mut [Counter]) {
    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.event.cmp(&b.event))
            .then_with(|| a.source.cmp(&b.source))
    });
}

/// Wall clock as unix milliseconds.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn datetime_from_millis(ms: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .map_err(|e| TrackerError::Internal(format!("timestamp out of range ({ms}): {e}")))
}

//! Query string access for the public endpoints.
//!
//! A repeated parameter keeps its last value, so `?k=a&k=b` reads as `k=b`
//! instead of failing the whole query.

use std::collections::HashMap;

use axum::extract::{rejection::QueryRejection, Query};

/// Raw pairs as axum hands them over.
pub type RawQuery = Result<Query<Vec<(String, String)>>, QueryRejection>;

#[derive(Debug, Default)]
pub struct QueryParams {
    values: HashMap<String, String>,
}

impl QueryParams {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        // Later pairs overwrite earlier ones.
        Self {
            values: pairs.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

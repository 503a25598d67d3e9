//! API models for request and response payloads

use serde::Deserialize;

pub mod category;
pub mod post;
pub mod user;

/// Query string for listing endpoints
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// Query string for the public search endpoint
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

//! Post and comment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::image::ImageData;

/// A blog post as returned by listing and detail endpoints
///
/// The image bytes are deliberately absent: they only ever leave the store
/// through the dedicated image endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub author_name: String,
    pub category: String,
    pub status: String,
    pub posted_at: DateTime<Utc>,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields for creating a post; the category is resolved to an id
/// by the handler before insertion
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub author_name: Option<String>,
    pub status: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub image: Option<ImageData>,
}

/// Partial update for a post; `None` leaves the stored value untouched
#[derive(Debug, Default, Clone)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author_name: Option<String>,
    pub status: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub image: Option<ImageData>,
}

/// A comment on a post
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A comment flattened with its parent post, for the admin listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentWithPost {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub username: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub post: String,
    pub post_id: Uuid,
}

/// Request body for adding a comment
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: Option<String>,
}

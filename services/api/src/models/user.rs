//! User models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::image::ImageData;

/// Full user record including the password hash
///
/// Internal only: this struct is never serialized. API responses go through
/// [`UserResponse`], which carries neither the hash nor the image bytes.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub status: Option<String>,
    pub google_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sanitized user for API responses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            username: user.username,
            role: user.role,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Request for user signup
///
/// Required fields are optional here so that missing values produce a 400
/// with a field-specific message instead of a deserialization failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub image: Option<serde_json::Value>,
}

/// Request for user login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Validated fields for inserting a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub status: Option<String>,
    pub image: Option<ImageData>,
    pub google_id: Option<String>,
}

/// Partial profile update
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

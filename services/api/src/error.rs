//! Custom error types for the API service
//!
//! Every failure surfaced to a client goes through [`ApiError`], which maps
//! the error taxonomy onto HTTP statuses and renders the shared
//! `{status: "fail"|"error", message}` envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed input, including duplicate unique fields
    #[error("{0}")]
    Validation(String),

    /// Missing, invalid or expired credentials
    #[error("{0}")]
    Auth(String),

    /// Authenticated but lacking the required role
    #[error("{0}")]
    Forbidden(String),

    /// Resource does not exist
    #[error("{0}")]
    NotFound(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unexpected internal error
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Translate unique-constraint violations into field-naming messages.
    ///
    /// Anything that is not a recognized unique violation passes through as
    /// a database error.
    pub fn from_unique_violation(err: sqlx::Error) -> ApiError {
        if let sqlx::Error::Database(db_err) = &err {
            let field = match db_err.constraint() {
                Some("users_email_key") => Some("email"),
                Some("users_username_key") => Some("username"),
                Some("users_google_id_key") => Some("google account"),
                _ => None,
            };
            if let Some(field) = field {
                return ApiError::Validation(format!(
                    "An account with this {field} already exists. Please use a different {field}."
                ));
            }
            if db_err.constraint() == Some("categories_name_key") {
                return ApiError::Validation(
                    "A category with this name already exists. Please use a different name."
                        .to_string(),
                );
            }
        }
        ApiError::Database(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self);
            if cfg!(debug_assertions) {
                self.to_string()
            } else {
                "Something went very wrong!".to_string()
            }
        } else {
            self.to_string()
        };

        let status_label = if status.is_server_error() {
            "error"
        } else {
            "fail"
        };

        let body = Json(json!({
            "status": status_label,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            ApiError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Auth("no".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("no".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("gone".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_client_error_envelope() {
        let response = ApiError::Validation("Title is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "fail");
        assert_eq!(body["message"], "Title is required");
    }

    #[tokio::test]
    async fn test_server_error_envelope() {
        let response = ApiError::Internal(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "error");
    }

    #[test]
    fn test_unique_violation_passthrough() {
        let err = ApiError::from_unique_violation(sqlx::Error::RowNotFound);
        assert!(matches!(err, ApiError::Database(_)));
    }
}

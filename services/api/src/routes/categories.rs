//! Category handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::ApiError, models::category::CategoryRequest, state::AppState, validation,
};

/// Public listing of all categories
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state.categories.list().await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "categories": categories },
    })))
}

/// Admin category creation
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = validation::validate_required("Category name", payload.name.as_deref())
        .map_err(ApiError::Validation)?;

    let category = state.categories.create(&name).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": { "category": category },
        })),
    ))
}

/// Admin category rename
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = validation::validate_required("Category name", payload.name.as_deref())
        .map_err(ApiError::Validation)?;

    let category = state.categories.update(id, &name).await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "category": category },
    })))
}

/// Admin category removal; posts in it become uncategorized
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state.categories.delete(id).await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "category": category },
    })))
}

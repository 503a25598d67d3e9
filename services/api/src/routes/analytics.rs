//! Admin analytics handlers

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::{error::ApiError, state::AppState};

/// Site-wide totals for the dashboard header
pub async fn dashboard_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state.stats.dashboard().await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "stats": stats },
    })))
}

/// The five most recently created posts
pub async fn recent_posts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let posts = state.stats.recent_posts().await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "posts": posts },
    })))
}

/// The five most viewed published posts
pub async fn top_posts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let posts = state.stats.top_posts().await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "posts": posts },
    })))
}

/// Post counts per category
pub async fn posts_by_category(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.stats.posts_by_category().await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "categories": categories },
    })))
}

/// Daily signups over the last 30 days
pub async fn user_activity(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let activity = state.stats.user_activity().await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "activity": activity },
    })))
}

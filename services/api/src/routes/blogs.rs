//! Blog post handlers: authoring, listings, engagement

use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::ApiError,
    image::ImageData,
    middleware::CurrentUser,
    models::{
        ListQuery, SearchQuery,
        post::{CommentRequest, NewPost, PostUpdate},
    },
    state::AppState,
    validation,
};

/// The fields a multipart authoring request may carry
#[derive(Debug, Default)]
struct BlogForm {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    author_name: Option<String>,
    status: Option<String>,
    posted_at: Option<DateTime<Utc>>,
    image: Option<ImageData>,
}

/// Drain a multipart authoring request into its typed fields
///
/// The image field accepts either a file part or a text part holding a data
/// URI / base64 string; both normalize through [`ImageData`].
async fn parse_blog_form(mut multipart: Multipart) -> Result<BlogForm, ApiError> {
    let mut form = BlogForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart payload: {e}")))?
    {
        let Some(name) = field.name().map(|n| n.to_string()) else {
            continue;
        };

        match name.as_str() {
            "title" => form.title = Some(text_field(field).await?),
            "description" => form.description = Some(text_field(field).await?),
            "category" => form.category = Some(text_field(field).await?),
            "authorName" => form.author_name = Some(text_field(field).await?),
            "status" => form.status = Some(text_field(field).await?),
            "postedAt" => {
                let value = text_field(field).await?;
                let parsed = DateTime::parse_from_rfc3339(value.trim()).map_err(|_| {
                    ApiError::Validation("postedAt must be an RFC 3339 timestamp".to_string())
                })?;
                form.posted_at = Some(parsed.with_timezone(&Utc));
            }
            "image" => {
                form.image = Some(ImageData::from_field(field).await.map_err(ApiError::Validation)?);
            }
            // Unknown fields are ignored rather than rejected
            _ => {}
        }
    }

    // Status is a free-form label ("Draft", "Published", "Scheduled", ...);
    // only "Published" carries meaning, driving public visibility
    Ok(form)
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart payload: {e}")))
}

/// Resolve a submitted category name to its id, creating it when new.
/// Blank input means "leave uncategorized" rather than an error.
async fn resolve_category(
    state: &AppState,
    category: Option<&str>,
) -> Result<Option<Uuid>, ApiError> {
    match category.map(str::trim) {
        Some(name) if !name.is_empty() => Ok(Some(state.categories.find_or_create(name).await?)),
        _ => Ok(None),
    }
}

/// Authenticated listing of all posts, drafts included
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let all_blogs = state.posts.list(query.limit).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Successfully got all Blogs.",
        "blogs": { "allBlogs": all_blogs },
    })))
}

/// Anonymous listing: published posts only, few by default
pub async fn public_blogs(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let all_blogs = state.posts.list_public(query.limit).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Successfully got all Blogs.",
        "blogs": { "allBlogs": all_blogs },
    })))
}

/// Public search over published posts
pub async fn search_blogs(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let q = query.q.unwrap_or_default();
    let all_blogs = state.posts.search(&q).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Successfully got all Blogs.",
        "blogs": { "allBlogs": all_blogs },
    })))
}

/// Fetch one post and count the view
///
/// Drafts are visible to authenticated callers only; anonymous requests get
/// a 404 rather than a hint that the draft exists.
pub async fn get_blog(
    State(state): State<AppState>,
    current: Option<Extension<CurrentUser>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut blog = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blog not found".to_string()))?;

    if current.is_none() && blog.status != "Published" {
        return Err(ApiError::NotFound("Blog not found".to_string()));
    }

    if let Some(views) = state.posts.increment_views(id).await? {
        blog.views = views;
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Successfully got a Blog.",
        "blog": { "blog": blog },
    })))
}

/// Create a post from a multipart form
pub async fn create_blog(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = parse_blog_form(multipart).await?;

    let title = validation::validate_required("Title", form.title.as_deref())
        .map_err(ApiError::Validation)?;
    let description = validation::validate_required("Description", form.description.as_deref())
        .map_err(ApiError::Validation)?;

    let category_id = resolve_category(&state, form.category.as_deref()).await?;

    let new_post = NewPost {
        title,
        description,
        author_name: form.author_name,
        status: form.status,
        posted_at: form.posted_at,
        image: form.image,
    };
    let blog = state.posts.create(&new_post, category_id).await?;

    info!("Blog post created: {}", blog.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Blog post created successfully",
            "blog": blog,
        })),
    ))
}

/// Partially update a post from a multipart form
pub async fn update_blog(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = parse_blog_form(multipart).await?;

    // Fields absent from the form keep their stored value, but a field that
    // is present must still be valid
    let title = form
        .title
        .as_deref()
        .map(|t| validation::validate_required("Title", Some(t)))
        .transpose()
        .map_err(ApiError::Validation)?;
    let description = form
        .description
        .as_deref()
        .map(|d| validation::validate_required("Description", Some(d)))
        .transpose()
        .map_err(ApiError::Validation)?;

    let category_id = resolve_category(&state, form.category.as_deref()).await?;

    let update = PostUpdate {
        title,
        description,
        author_name: form.author_name,
        status: form.status,
        posted_at: form.posted_at,
        image: form.image,
    };
    let updated_blog = state
        .posts
        .update(id, &update, category_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blog not found".to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "message": "Blog updated successfully",
        "blog": { "updatedBlog": updated_blog },
    })))
}

/// Delete a post
pub async fn delete_blog(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted_blog = state
        .posts
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blog not found".to_string()))?;

    info!("Blog post deleted: {}", id);

    Ok(Json(json!({
        "status": "success",
        "message": "Blog deleted successfully",
        "blog": { "deletedBlog": deleted_blog },
    })))
}

/// Serve the stored post image bytes with their content type
pub async fn blog_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (bytes, content_type) = state
        .posts
        .get_image(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Image not found".to_string()))?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

/// Like a post on behalf of the caller; repeated likes are no-ops
pub async fn like_blog(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let likes = state.posts.like(id, current.id).await?;
    let blog = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blog not found".to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "message": "Blog liked successfully",
        "liked": true,
        "likes": likes,
        "blog": blog,
    })))
}

/// Withdraw the caller's like; a count of zero is the floor
pub async fn unlike_blog(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let likes = state.posts.unlike(id, current.id).await?;
    let blog = state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blog not found".to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "message": "Blog unliked successfully",
        "liked": false,
        "likes": likes,
        "blog": blog,
    })))
}

/// Add a comment under the caller's username
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text =
        validation::validate_comment_text(payload.text.as_deref()).map_err(ApiError::Validation)?;

    let blog = state
        .posts
        .add_comment(id, current.id, &current.username, &text)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blog not found".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Comment added successfully",
            "blog": blog,
        })),
    ))
}

/// Public listing of the comments on one post
pub async fn get_comments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = state
        .posts
        .comments(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Blog not found".to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "comments": comments,
    })))
}

/// Admin moderation view of every comment across all posts
pub async fn all_comments(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let comments = state.posts.all_comments().await?;

    Ok(Json(json!({
        "status": "success",
        "comments": comments,
    })))
}

/// Admin comment removal
pub async fn delete_comment(
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .posts
        .delete_comment(id, comment_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "message": "Comment deleted successfully",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        routing::post,
    };
    use tower::ServiceExt;

    fn form_app() -> Router {
        Router::new().route(
            "/form",
            post(|multipart: Multipart| async move {
                let form = parse_blog_form(multipart).await?;
                Ok::<_, ApiError>(Json(json!({
                    "title": form.title,
                    "status": form.status,
                    "postedAt": form.posted_at,
                })))
            }),
        )
    }

    fn multipart_body(boundary: &str, fields: &[(&str, &str)]) -> String {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{boundary}--\r\n"));
        body
    }

    async fn submit(fields: &[(&str, &str)]) -> (StatusCode, serde_json::Value) {
        let boundary = "test-boundary";
        let response = form_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/form")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(multipart_body(boundary, fields)))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_form_accepts_any_status_label() {
        for status in ["Draft", "Published", "Scheduled"] {
            let (code, body) = submit(&[("title", "Launch plan"), ("status", status)]).await;
            assert_eq!(code, StatusCode::OK, "status {status} rejected");
            assert_eq!(body["status"], status);
            assert_eq!(body["title"], "Launch plan");
        }
    }

    #[tokio::test]
    async fn test_form_parses_posted_at() {
        let (code, body) = submit(&[("postedAt", "2026-08-30T12:00:00Z")]).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["postedAt"], "2026-08-30T12:00:00Z");
    }

    #[tokio::test]
    async fn test_form_rejects_bad_posted_at() {
        let (code, body) = submit(&[("postedAt", "yesterday")]).await;
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "postedAt must be an RFC 3339 timestamp");
    }
}

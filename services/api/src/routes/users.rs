//! Account handlers: signup, login, profile management

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::ApiError,
    image::ImageData,
    middleware::CurrentUser,
    models::user::{LoginRequest, NewUser, SignupRequest, UserResponse, UserUpdate},
    state::AppState,
    validation,
};

/// Validate a signup payload into an insertable user
///
/// `allow_role` is false on the public signup path, where the requested role
/// is ignored and every account starts as a regular user.
fn build_new_user(payload: &SignupRequest, allow_role: bool) -> Result<NewUser, ApiError> {
    let full_name = validation::validate_required("Full name", payload.full_name.as_deref())
        .map_err(ApiError::Validation)?;

    let email = validation::validate_required("Email", payload.email.as_deref())
        .map_err(ApiError::Validation)?;
    let email = validation::normalize_email(&email);
    validation::validate_email(&email).map_err(ApiError::Validation)?;

    let username = validation::validate_required("Username", payload.username.as_deref())
        .map_err(ApiError::Validation)?;
    validation::validate_username(&username).map_err(ApiError::Validation)?;

    let password = payload.password.as_deref().unwrap_or_default();
    validation::validate_password(password).map_err(ApiError::Validation)?;
    validation::validate_password_confirm(password, payload.password_confirm.as_deref())
        .map_err(ApiError::Validation)?;

    let image = payload
        .image
        .as_ref()
        .map(ImageData::from_json)
        .transpose()
        .map_err(ApiError::Validation)?;

    let role = if allow_role {
        payload.role.clone().unwrap_or_else(|| "user".to_string())
    } else {
        "user".to_string()
    };

    Ok(NewUser {
        full_name,
        email,
        username,
        password: password.to_string(),
        role,
        status: payload.status.clone(),
        image,
        google_id: None,
    })
}

/// Register a new account and sign the caller in
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_user = build_new_user(&payload, false)?;
    let user = state.users.create(&new_user).await?;
    let token = state.jwt.issue_token(user.id, &user.role)?;

    info!("User signed up: {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "token": token,
            "data": { "user": UserResponse::from(user) },
        })),
    ))
}

/// Exchange email and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(email), Some(password)) = (payload.email.as_deref(), payload.password.as_deref())
    else {
        return Err(ApiError::Validation(
            "Please provide email and password".to_string(),
        ));
    };

    let email = validation::normalize_email(email);
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .filter(|user| state.users.verify_password(password, &user.password_hash))
        .ok_or_else(|| ApiError::Auth("Incorrect email or password".to_string()))?;

    let token = state.jwt.issue_token(user.id, &user.role)?;

    info!("User logged in: {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "token": token,
        })),
    ))
}

/// Admin listing of all accounts
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = state.users.list().await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "users": users },
    })))
}

/// Drain the admin account-creation multipart form; the image part may be
/// a file upload or a base64 string
async fn parse_user_form(
    mut multipart: Multipart,
) -> Result<(SignupRequest, Option<ImageData>), ApiError> {
    let mut payload = SignupRequest {
        full_name: None,
        email: None,
        username: None,
        password: None,
        password_confirm: None,
        role: None,
        status: None,
        image: None,
    };
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Invalid multipart payload: {e}")))?
    {
        let Some(name) = field.name().map(|n| n.to_string()) else {
            continue;
        };

        if name == "image" {
            image = Some(ImageData::from_field(field).await.map_err(ApiError::Validation)?);
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ApiError::Validation(format!("Invalid multipart payload: {e}")))?;
        match name.as_str() {
            "fullName" => payload.full_name = Some(value),
            "email" => payload.email = Some(value),
            "username" => payload.username = Some(value),
            "password" => payload.password = Some(value),
            "passwordConfirm" => payload.password_confirm = Some(value),
            "role" => payload.role = Some(value),
            "status" => payload.status = Some(value),
            _ => {}
        }
    }

    Ok((payload, image))
}

/// Admin account creation; unlike signup, the role in the payload is honored
pub async fn create_user(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (payload, image) = parse_user_form(multipart).await?;
    let mut new_user = build_new_user(&payload, true)?;
    if image.is_some() {
        new_user.image = image;
    }
    let user = state.users.create(&new_user).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "data": { "user": UserResponse::from(user) },
        })),
    ))
}

/// The caller's own profile
pub async fn get_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .users
        .find_by_id(current.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "data": { "user": user },
    })))
}

/// Fetch one account by id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "status": "success",
        "data": { "user": user },
    })))
}

/// Update a profile; callers may edit themselves, admins may edit anyone,
/// and only admins may change roles
pub async fn update_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    if current.id != id && !current.is_admin() {
        return Err(ApiError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ));
    }
    if payload.role.is_some() && !current.is_admin() {
        return Err(ApiError::Forbidden(
            "You do not have permission to change roles".to_string(),
        ));
    }

    let email = payload
        .email
        .as_deref()
        .map(|email| {
            let email = validation::normalize_email(email);
            validation::validate_email(&email).map_err(ApiError::Validation)?;
            Ok::<_, ApiError>(email)
        })
        .transpose()?;

    if let Some(username) = payload.username.as_deref() {
        validation::validate_username(username).map_err(ApiError::Validation)?;
    }

    let update = UserUpdate { email, ..payload };
    let user = state.users.update(id, &update).await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "user": user },
    })))
}

/// Admin account removal
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.users.delete(id).await?;

    info!("User deleted: {}", user.username);

    Ok(Json(json!({
        "status": "success",
        "data": { "user": user },
    })))
}

/// Serve the stored avatar bytes with their content type
pub async fn user_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (bytes, content_type) = state
        .users
        .get_image(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Image not found".to_string()))?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> SignupRequest {
        SignupRequest {
            full_name: Some("Jane Doe".to_string()),
            email: Some("jane@example.com".to_string()),
            username: Some("jane_doe".to_string()),
            password: Some("password123".to_string()),
            password_confirm: Some("password123".to_string()),
            role: None,
            status: None,
            image: None,
        }
    }

    #[test]
    fn test_signup_ignores_requested_role() {
        let mut payload = valid_payload();
        payload.role = Some("admin".to_string());

        let new_user = build_new_user(&payload, false).unwrap();
        assert_eq!(new_user.role, "user");
    }

    #[test]
    fn test_admin_creation_honors_requested_role() {
        let mut payload = valid_payload();
        payload.role = Some("admin".to_string());

        let new_user = build_new_user(&payload, true).unwrap();
        assert_eq!(new_user.role, "admin");

        payload.role = None;
        let new_user = build_new_user(&payload, true).unwrap();
        assert_eq!(new_user.role, "user");
    }

    #[test]
    fn test_signup_normalizes_email() {
        let mut payload = valid_payload();
        payload.email = Some("  Jane@Example.COM ".to_string());

        let new_user = build_new_user(&payload, false).unwrap();
        assert_eq!(new_user.email, "jane@example.com");
    }

    #[test]
    fn test_signup_requires_matching_confirmation() {
        let mut payload = valid_payload();
        payload.password_confirm = Some("different".to_string());

        match build_new_user(&payload, false) {
            Err(ApiError::Validation(msg)) => assert_eq!(msg, "Passwords do not match"),
            other => panic!("Expected a validation error, got {other:?}"),
        }
    }
}

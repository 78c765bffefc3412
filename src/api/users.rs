use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::info;

use super::auth::ensure_owner;
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath};
use super::validation::{validate_email, validate_password, validate_user_name};
use crate::crypto::hash_password;
use crate::db::{MessageResponse, UpdateUserRequest, User, UserDetailResponse, UserResponse};
use crate::AppState;

pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = User::list(&state.db).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<UserDetailResponse>, ApiError> {
    let user = User::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserDetailResponse::load(&state.db, user).await?))
}

fn validate_update_request(req: &UpdateUserRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Some(name) = &req.name {
        errors.check("name", validate_user_name(name.trim()));
    }
    if let Some(email) = &req.email {
        errors.check("email", validate_email(email.trim()));
    }
    if let Some(password) = &req.password {
        errors.check("password", validate_password(password));
    }

    errors.finish()
}

/// Update a user's profile. Only the user themself or an admin may do this.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    current: User,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let target = User::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    ensure_owner(&current, target.id)?;

    validate_update_request(&req)?;

    let name = req.name.as_deref().map(str::trim);
    let email = req.email.as_deref().map(|e| e.trim().to_lowercase());
    let password_hash = match &req.password {
        Some(password) => Some(
            hash_password(password)
                .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?,
        ),
        None => None,
    };

    let user = User::update(
        &state.db,
        target.id,
        name,
        email.as_deref(),
        password_hash.as_deref(),
    )
    .await
    .map_err(|e| ApiError::on_unique(e, "Email already registered"))?;

    info!(user_id = %user.id, updated_by = %current.id, "Updated user");
    Ok(Json(UserResponse::from(user)))
}

/// Delete a user along with their sessions, scores and achievements
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    current: User,
) -> Result<Json<MessageResponse>, ApiError> {
    let target = User::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    ensure_owner(&current, target.id)?;

    if !User::delete(&state.db, target.id).await? {
        return Err(ApiError::not_found("User not found"));
    }

    info!(user_id = %target.id, deleted_by = %current.id, "Deleted user");
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

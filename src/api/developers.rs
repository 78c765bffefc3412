use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath};
use super::validation::{validate_required, MAX_NAME_LEN};
use crate::db::{
    CreateDeveloperRequest, Developer, DeveloperResponse, MessageResponse, UpdateDeveloperRequest,
    User,
};
use crate::AppState;

const DUPLICATE: &str = "A developer with this name already exists";

pub async fn list_developers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DeveloperResponse>>, ApiError> {
    let developers = Developer::list(&state.db).await?;

    let mut responses = Vec::with_capacity(developers.len());
    for developer in developers {
        responses.push(DeveloperResponse::load(&state.db, developer).await?);
    }
    Ok(Json(responses))
}

pub async fn get_developer(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<DeveloperResponse>, ApiError> {
    let developer = Developer::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Developer not found"))?;

    Ok(Json(DeveloperResponse::load(&state.db, developer).await?))
}

pub async fn create_developer(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(req): ApiJson<CreateDeveloperRequest>,
) -> Result<(StatusCode, Json<DeveloperResponse>), ApiError> {
    let name = req.name.trim();
    validate_required("Name", name, MAX_NAME_LEN)
        .map_err(|e| ApiError::validation_field("name", e))?;

    let developer = Developer::create(&state.db, name)
        .await
        .map_err(|e| ApiError::on_unique(e, DUPLICATE))?;

    info!(
        developer_id = %developer.id,
        user_id = %user.id,
        "Created developer {}",
        developer.name
    );
    Ok((
        StatusCode::CREATED,
        Json(DeveloperResponse::load(&state.db, developer).await?),
    ))
}

pub async fn update_developer(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateDeveloperRequest>,
) -> Result<Json<DeveloperResponse>, ApiError> {
    if !Developer::exists(&state.db, id).await? {
        return Err(ApiError::not_found("Developer not found"));
    }

    let name = req.name.as_deref().map(str::trim);
    if let Some(name) = name {
        validate_required("Name", name, MAX_NAME_LEN)
            .map_err(|e| ApiError::validation_field("name", e))?;
    }

    let developer = Developer::update(&state.db, id, name)
        .await
        .map_err(|e| ApiError::on_unique(e, DUPLICATE))?;

    Ok(Json(DeveloperResponse::load(&state.db, developer).await?))
}

/// Delete a developer. Refused while any game still references it.
pub async fn delete_developer(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    user: User,
) -> Result<Json<MessageResponse>, ApiError> {
    if !Developer::exists(&state.db, id).await? {
        return Err(ApiError::not_found("Developer not found"));
    }

    let games = Developer::game_count(&state.db, id).await?;
    if games > 0 {
        return Err(ApiError::conflict(format!(
            "Developer still has {} game(s)",
            games
        )));
    }

    Developer::delete(&state.db, id).await?;

    info!(developer_id = %id, user_id = %user.id, "Deleted developer");
    Ok(Json(MessageResponse::new("Developer deleted successfully")))
}

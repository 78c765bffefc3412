use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

use super::auth::{ensure_admin, ensure_owner};
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath};
use super::validation::{validate_required, MAX_DESCRIPTION_LEN, MAX_NAME_LEN};
use crate::db::{
    Achievement, AchievementResponse, CreateAchievementRequest, Game, MessageResponse,
    UpdateAchievementRequest, User,
};
use crate::AppState;

const DUPLICATE: &str = "An achievement with this name already exists";

async fn load_achievement(state: &AppState, id: i64) -> Result<Achievement, ApiError> {
    Achievement::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Achievement not found"))
}

pub async fn list_achievements(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AchievementResponse>>, ApiError> {
    let achievements = Achievement::list(&state.db).await?;

    let mut responses = Vec::with_capacity(achievements.len());
    for achievement in achievements {
        responses.push(AchievementResponse::load(&state.db, achievement).await?);
    }
    Ok(Json(responses))
}

pub async fn get_achievement(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<AchievementResponse>, ApiError> {
    let achievement = load_achievement(&state, id).await?;
    Ok(Json(AchievementResponse::load(&state.db, achievement).await?))
}

/// Award an achievement. Awarding to somebody else requires an admin.
pub async fn create_achievement(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(req): ApiJson<CreateAchievementRequest>,
) -> Result<(StatusCode, Json<AchievementResponse>), ApiError> {
    let name = req.name.trim();
    let description = req.description.trim();

    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("name", validate_required("Name", name, MAX_NAME_LEN))
        .check(
            "description",
            validate_required("Description", description, MAX_DESCRIPTION_LEN),
        );
    errors.finish()?;

    let recipient = req.user_id.unwrap_or(user.id);
    if recipient != user.id {
        ensure_admin(&user)?;
        if !User::exists(&state.db, recipient).await? {
            return Err(ApiError::not_found("User not found"));
        }
    }

    if !Game::exists(&state.db, req.game_id).await? {
        return Err(ApiError::not_found("Game not found"));
    }

    let achievement = Achievement::create(&state.db, name, description, recipient, req.game_id)
        .await
        .map_err(|e| ApiError::on_unique(e, DUPLICATE))?;

    info!(
        achievement_id = %achievement.id,
        user_id = %recipient,
        awarded_by = %user.id,
        "Awarded achievement {}",
        achievement.name
    );
    Ok((
        StatusCode::CREATED,
        Json(AchievementResponse::load(&state.db, achievement).await?),
    ))
}

pub async fn update_achievement(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    user: User,
    ApiJson(req): ApiJson<UpdateAchievementRequest>,
) -> Result<Json<AchievementResponse>, ApiError> {
    let achievement = load_achievement(&state, id).await?;
    ensure_owner(&user, achievement.user_id)?;

    let name = req.name.as_deref().map(str::trim);
    let description = req.description.as_deref().map(str::trim);

    let mut errors = ValidationErrorBuilder::new();
    if let Some(name) = name {
        errors.check("name", validate_required("Name", name, MAX_NAME_LEN));
    }
    if let Some(description) = description {
        errors.check(
            "description",
            validate_required("Description", description, MAX_DESCRIPTION_LEN),
        );
    }
    errors.finish()?;

    let achievement = Achievement::update(&state.db, achievement.id, name, description)
        .await
        .map_err(|e| ApiError::on_unique(e, DUPLICATE))?;

    Ok(Json(AchievementResponse::load(&state.db, achievement).await?))
}

pub async fn delete_achievement(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    user: User,
) -> Result<Json<MessageResponse>, ApiError> {
    let achievement = load_achievement(&state, id).await?;
    ensure_owner(&user, achievement.user_id)?;

    Achievement::delete(&state.db, achievement.id).await?;

    info!(achievement_id = %id, user_id = %user.id, "Deleted achievement");
    Ok(Json(MessageResponse::new("Achievement deleted successfully")))
}

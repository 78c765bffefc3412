use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath};
use super::validation::{
    validate_description, validate_release_date, validate_required, MAX_TITLE_LEN,
};
use crate::db::{
    CreateGameRequest, Developer, DbPool, Game, GameResponse, Genre, MessageResponse,
    UpdateGameRequest, User,
};
use crate::AppState;

const DUPLICATE: &str = "A game with this title already exists";

fn validate_create_request(req: &CreateGameRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("title", validate_required("Title", &req.title, MAX_TITLE_LEN))
        .check("description", validate_description(&req.description))
        .check("release_date", validate_release_date(&req.release_date));
    errors.finish()
}

fn validate_update_request(req: &UpdateGameRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(title) = &req.title {
        errors.check("title", validate_required("Title", title, MAX_TITLE_LEN));
    }
    if let Some(description) = &req.description {
        errors.check("description", validate_description(description));
    }
    if let Some(release_date) = &req.release_date {
        errors.check("release_date", validate_release_date(release_date));
    }
    errors.finish()
}

/// Both parents must exist before a game may point at them
async fn ensure_parents_exist(
    db: &DbPool,
    genre_id: Option<i64>,
    developer_id: Option<i64>,
) -> Result<(), ApiError> {
    if let Some(genre_id) = genre_id {
        if !Genre::exists(db, genre_id).await? {
            return Err(ApiError::not_found("Genre not found"));
        }
    }
    if let Some(developer_id) = developer_id {
        if !Developer::exists(db, developer_id).await? {
            return Err(ApiError::not_found("Developer not found"));
        }
    }
    Ok(())
}

pub async fn list_games(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GameResponse>>, ApiError> {
    let games = Game::list(&state.db).await?;

    let mut responses = Vec::with_capacity(games.len());
    for game in games {
        responses.push(GameResponse::load(&state.db, game).await?);
    }
    Ok(Json(responses))
}

pub async fn get_game(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<GameResponse>, ApiError> {
    let game = Game::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Game not found"))?;

    Ok(Json(GameResponse::load(&state.db, game).await?))
}

pub async fn create_game(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(mut req): ApiJson<CreateGameRequest>,
) -> Result<(StatusCode, Json<GameResponse>), ApiError> {
    req.title = req.title.trim().to_string();
    validate_create_request(&req)?;
    ensure_parents_exist(&state.db, Some(req.genre_id), Some(req.developer_id)).await?;

    let game = Game::create(&state.db, &req)
        .await
        .map_err(|e| ApiError::on_unique(e, DUPLICATE))?;

    info!(game_id = %game.id, user_id = %user.id, "Created game {}", game.title);
    Ok((
        StatusCode::CREATED,
        Json(GameResponse::load(&state.db, game).await?),
    ))
}

pub async fn update_game(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(mut req): ApiJson<UpdateGameRequest>,
) -> Result<Json<GameResponse>, ApiError> {
    if !Game::exists(&state.db, id).await? {
        return Err(ApiError::not_found("Game not found"));
    }

    req.title = req.title.map(|t| t.trim().to_string());
    validate_update_request(&req)?;
    ensure_parents_exist(&state.db, req.genre_id, req.developer_id).await?;

    let game = Game::update(&state.db, id, &req)
        .await
        .map_err(|e| ApiError::on_unique(e, DUPLICATE))?;

    Ok(Json(GameResponse::load(&state.db, game).await?))
}

/// Delete a game together with its sessions, scores and achievements
pub async fn delete_game(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    user: User,
) -> Result<Json<MessageResponse>, ApiError> {
    if !Game::delete(&state.db, id).await? {
        return Err(ApiError::not_found("Game not found"));
    }

    info!(game_id = %id, user_id = %user.id, "Deleted game");
    Ok(Json(MessageResponse::new("Game deleted successfully")))
}

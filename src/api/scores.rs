//! Scores, scoped to the user who set them, plus the public per-game
//! leaderboard.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

use super::auth::ensure_owner;
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::validation::validate_score_value;
use crate::db::{
    CreateScoreRequest, Game, LeaderboardEntry, LeaderboardQuery, MessageResponse, Score,
    ScoreQuery, ScoreResponse, UpdateScoreRequest, User, UserResponse,
};
use crate::AppState;

pub const DEFAULT_LEADERBOARD_SIZE: i64 = 10;
pub const MAX_LEADERBOARD_SIZE: i64 = 100;

async fn load_score(state: &AppState, id: i64) -> Result<Score, ApiError> {
    Score::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Score not found"))
}

/// The caller's own scores, optionally for a single game
pub async fn list_scores(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiQuery(query): ApiQuery<ScoreQuery>,
) -> Result<Json<Vec<ScoreResponse>>, ApiError> {
    let scores = Score::list_for_user(&state.db, user.id, query.game_id).await?;

    let mut responses = Vec::with_capacity(scores.len());
    for score in scores {
        responses.push(ScoreResponse::load(&state.db, score).await?);
    }
    Ok(Json(responses))
}

pub async fn get_score(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    user: User,
) -> Result<Json<ScoreResponse>, ApiError> {
    let score = load_score(&state, id).await?;
    ensure_owner(&user, score.user_id)?;

    Ok(Json(ScoreResponse::load(&state.db, score).await?))
}

pub async fn create_score(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(req): ApiJson<CreateScoreRequest>,
) -> Result<(StatusCode, Json<ScoreResponse>), ApiError> {
    validate_score_value(req.value).map_err(|e| ApiError::validation_field("value", e))?;

    if !Game::exists(&state.db, req.game_id).await? {
        return Err(ApiError::not_found("Game not found"));
    }

    let score = Score::create(&state.db, user.id, req.game_id, req.value).await?;

    info!(
        score_id = %score.id,
        user_id = %user.id,
        game_id = %score.game_id,
        value = score.value,
        "Recorded score"
    );
    Ok((
        StatusCode::CREATED,
        Json(ScoreResponse::load(&state.db, score).await?),
    ))
}

pub async fn update_score(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    user: User,
    ApiJson(req): ApiJson<UpdateScoreRequest>,
) -> Result<Json<ScoreResponse>, ApiError> {
    let score = load_score(&state, id).await?;
    ensure_owner(&user, score.user_id)?;

    if let Some(value) = req.value {
        validate_score_value(value).map_err(|e| ApiError::validation_field("value", e))?;
    }

    let score = Score::update(&state.db, score.id, req.value).await?;
    Ok(Json(ScoreResponse::load(&state.db, score).await?))
}

pub async fn delete_score(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    user: User,
) -> Result<Json<MessageResponse>, ApiError> {
    let score = load_score(&state, id).await?;
    ensure_owner(&user, score.user_id)?;

    Score::delete(&state.db, score.id).await?;

    info!(score_id = %id, user_id = %user.id, "Deleted score");
    Ok(Json(MessageResponse::new("Score deleted successfully")))
}

/// Top scores for a game, highest first
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    ApiPath(game_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_LEADERBOARD_SIZE);
    if !(1..=MAX_LEADERBOARD_SIZE).contains(&limit) {
        return Err(ApiError::validation_field(
            "limit",
            format!("Limit must be between 1 and {}", MAX_LEADERBOARD_SIZE),
        ));
    }

    if !Game::exists(&state.db, game_id).await? {
        return Err(ApiError::not_found("Game not found"));
    }

    let scores = Score::top_for_game(&state.db, game_id, limit).await?;

    let mut entries = Vec::with_capacity(scores.len());
    for (index, score) in scores.into_iter().enumerate() {
        let user = User::get_by_id(&state.db, score.user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?;
        entries.push(LeaderboardEntry {
            rank: index + 1,
            score_id: score.id,
            value: score.value,
            date_achieved: score.date_achieved,
            user: UserResponse::from(user),
        });
    }
    Ok(Json(entries))
}

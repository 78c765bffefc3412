use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

use super::error::ApiError;
use super::extract::{ApiJson, ApiPath};
use super::validation::{validate_required, MAX_NAME_LEN};
use crate::db::{CreateGenreRequest, Genre, GenreResponse, MessageResponse, UpdateGenreRequest, User};
use crate::AppState;

const DUPLICATE: &str = "A genre with this name already exists";

pub async fn list_genres(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GenreResponse>>, ApiError> {
    let genres = Genre::list(&state.db).await?;

    let mut responses = Vec::with_capacity(genres.len());
    for genre in genres {
        responses.push(GenreResponse::load(&state.db, genre).await?);
    }
    Ok(Json(responses))
}

pub async fn get_genre(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<GenreResponse>, ApiError> {
    let genre = Genre::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Genre not found"))?;

    Ok(Json(GenreResponse::load(&state.db, genre).await?))
}

pub async fn create_genre(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(req): ApiJson<CreateGenreRequest>,
) -> Result<(StatusCode, Json<GenreResponse>), ApiError> {
    let name = req.name.trim();
    validate_required("Name", name, MAX_NAME_LEN)
        .map_err(|e| ApiError::validation_field("name", e))?;

    let genre = Genre::create(&state.db, name)
        .await
        .map_err(|e| ApiError::on_unique(e, DUPLICATE))?;

    info!(genre_id = %genre.id, user_id = %user.id, "Created genre {}", genre.name);
    Ok((
        StatusCode::CREATED,
        Json(GenreResponse::load(&state.db, genre).await?),
    ))
}

pub async fn update_genre(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateGenreRequest>,
) -> Result<Json<GenreResponse>, ApiError> {
    if !Genre::exists(&state.db, id).await? {
        return Err(ApiError::not_found("Genre not found"));
    }

    let name = req.name.as_deref().map(str::trim);
    if let Some(name) = name {
        validate_required("Name", name, MAX_NAME_LEN)
            .map_err(|e| ApiError::validation_field("name", e))?;
    }

    let genre = Genre::update(&state.db, id, name)
        .await
        .map_err(|e| ApiError::on_unique(e, DUPLICATE))?;

    Ok(Json(GenreResponse::load(&state.db, genre).await?))
}

/// Delete a genre. Refused while any game still belongs to it.
pub async fn delete_genre(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    user: User,
) -> Result<Json<MessageResponse>, ApiError> {
    if !Genre::exists(&state.db, id).await? {
        return Err(ApiError::not_found("Genre not found"));
    }

    let games = Genre::game_count(&state.db, id).await?;
    if games > 0 {
        return Err(ApiError::conflict(format!(
            "Genre is still assigned to {} game(s)",
            games
        )));
    }

    Genre::delete(&state.db, id).await?;

    info!(genre_id = %id, user_id = %user.id, "Deleted genre");
    Ok(Json(MessageResponse::new("Genre deleted successfully")))
}

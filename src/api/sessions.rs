//! Play sessions, scoped to the user who recorded them.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

use super::auth::ensure_owner;
use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::{ApiJson, ApiPath};
use super::validation::{parse_timestamp, validate_session_window};
use crate::db::{
    CreateSessionRequest, Game, MessageResponse, Session, SessionResponse, UpdateSessionRequest,
    User,
};
use crate::AppState;

/// Parse the optional start/end pair, collecting every field error
fn parse_window(
    start_time: Option<&str>,
    end_time: Option<&str>,
) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    let start = start_time.and_then(|s| match parse_timestamp("Start time", s) {
        Ok(t) => Some(t),
        Err(e) => {
            errors.add("start_time", e);
            None
        }
    });
    let end = end_time.and_then(|s| match parse_timestamp("End time", s) {
        Ok(t) => Some(t),
        Err(e) => {
            errors.add("end_time", e);
            None
        }
    });

    errors.finish()?;
    Ok((start, end))
}

async fn load_session(state: &AppState, id: i64) -> Result<Session, ApiError> {
    Session::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session not found"))
}

/// The caller's own sessions, most recent first
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<SessionResponse>>, ApiError> {
    let sessions = Session::list_for_user(&state.db, user.id).await?;

    let mut responses = Vec::with_capacity(sessions.len());
    for session in sessions {
        responses.push(SessionResponse::load(&state.db, session).await?);
    }
    Ok(Json(responses))
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    user: User,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = load_session(&state, id).await?;
    ensure_owner(&user, session.user_id)?;

    Ok(Json(SessionResponse::load(&state.db, session).await?))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    user: User,
    ApiJson(req): ApiJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let (start, end) = parse_window(req.start_time.as_deref(), req.end_time.as_deref())?;
    let start = start.unwrap_or_else(Utc::now);
    validate_session_window(&start, end.as_ref())
        .map_err(|e| ApiError::validation_field("end_time", e))?;

    if !Game::exists(&state.db, req.game_id).await? {
        return Err(ApiError::not_found("Game not found"));
    }

    let end = end.map(|t| t.to_rfc3339());
    let session = Session::create(
        &state.db,
        user.id,
        req.game_id,
        &start.to_rfc3339(),
        end.as_deref(),
    )
    .await?;

    info!(
        session_id = %session.id,
        user_id = %user.id,
        game_id = %session.game_id,
        "Started session"
    );
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::load(&state.db, session).await?),
    ))
}

pub async fn update_session(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    user: User,
    ApiJson(req): ApiJson<UpdateSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = load_session(&state, id).await?;
    ensure_owner(&user, session.user_id)?;

    // `end_time: null` clears the end and reopens the session
    let clear_end = matches!(req.end_time, Some(None));
    let (start, end) = parse_window(
        req.start_time.as_deref(),
        req.end_time.as_ref().and_then(|t| t.as_deref()),
    )?;

    // Check the window the row will end up with, not just the changed half
    let effective_start = match start {
        Some(t) => t,
        None => parse_timestamp("Start time", &session.start_time)
            .map_err(ApiError::internal)?,
    };
    let effective_end = match (end, session.end_time.as_deref()) {
        (Some(t), _) => Some(t),
        _ if clear_end => None,
        (None, Some(stored)) => {
            Some(parse_timestamp("End time", stored).map_err(ApiError::internal)?)
        }
        (None, None) => None,
    };
    validate_session_window(&effective_start, effective_end.as_ref())
        .map_err(|e| ApiError::validation_field("end_time", e))?;

    let start = start.map(|t| t.to_rfc3339());
    let end = end.map(|t| t.to_rfc3339());
    let end_update = match (&end, clear_end) {
        (Some(t), _) => Some(Some(t.as_str())),
        (None, true) => Some(None),
        (None, false) => None,
    };
    let session = Session::update(&state.db, session.id, start.as_deref(), end_update).await?;

    Ok(Json(SessionResponse::load(&state.db, session).await?))
}

pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    user: User,
) -> Result<Json<MessageResponse>, ApiError> {
    let session = load_session(&state, id).await?;
    ensure_owner(&user, session.user_id)?;

    Session::delete(&state.db, session.id).await?;

    info!(session_id = %id, user_id = %user.id, "Deleted session");
    Ok(Json(MessageResponse::new("Session deleted successfully")))
}

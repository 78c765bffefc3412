mod achievements;
pub mod auth;
mod developers;
pub mod error;
pub mod extract;
mod games;
mod genres;
pub mod rate_limit;
mod scores;
mod sessions;
mod users;
pub mod validation;

use axum::{
    extract::State,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;
use error::ApiError;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Credential endpoints draw from the tighter auth budget
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_auth,
        ));

    // Catalog reads and the leaderboard need no token
    let public_routes = Router::new()
        .route("/genres", get(genres::list_genres))
        .route("/genres/:id", get(genres::get_genre))
        .route("/developers", get(developers::list_developers))
        .route("/developers/:id", get(developers::get_developer))
        .route("/games", get(games::list_games))
        .route("/games/:id", get(games::get_game))
        .route("/games/:id/leaderboard", get(scores::leaderboard))
        .route("/achievements", get(achievements::list_achievements))
        .route("/achievements/:id", get(achievements::get_achievement));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        // Users
        .route("/users", get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        // Genres
        .route("/genres", post(genres::create_genre))
        .route(
            "/genres/:id",
            put(genres::update_genre)
                .patch(genres::update_genre)
                .delete(genres::delete_genre),
        )
        // Developers
        .route("/developers", post(developers::create_developer))
        .route(
            "/developers/:id",
            put(developers::update_developer)
                .patch(developers::update_developer)
                .delete(developers::delete_developer),
        )
        // Games
        .route("/games", post(games::create_game))
        .route(
            "/games/:id",
            put(games::update_game)
                .patch(games::update_game)
                .delete(games::delete_game),
        )
        // Sessions
        .route(
            "/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/sessions/:id",
            get(sessions::get_session)
                .put(sessions::update_session)
                .patch(sessions::update_session)
                .delete(sessions::delete_session),
        )
        // Scores
        .route("/scores", get(scores::list_scores).post(scores::create_score))
        .route(
            "/scores/:id",
            get(scores::get_score)
                .put(scores::update_score)
                .patch(scores::update_score)
                .delete(scores::delete_score),
        )
        // Achievements
        .route("/achievements", post(achievements::create_achievement))
        .route(
            "/achievements/:id",
            put(achievements::update_achievement)
                .patch(achievements::update_achievement)
                .delete(achievements::delete_achievement),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let api_routes = public_routes
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_api,
        ))
        .merge(auth_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check(State(state): State<Arc<AppState>>) -> Result<&'static str, ApiError> {
    crate::db::ping(&state.db).await.map_err(|e| {
        tracing::error!("Health check failed: {}", e);
        ApiError::service_unavailable("Database unavailable")
    })?;
    Ok("OK")
}

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use questlog::api::{auth::ensure_admin_user, create_router};
use questlog::config::Config;
use questlog::AppState;

const ADMIN_EMAIL: &str = "admin@questlog.test";
const ADMIN_PASSWORD: &str = "admin-password";

fn test_config() -> Config {
    let mut config = Config::default();
    config.database.url = "sqlite::memory:".to_string();
    config.auth.jwt_secret = Some("integration-test-secret".to_string());
    config.auth.admin_email = Some(ADMIN_EMAIL.to_string());
    config.auth.admin_password = Some(ADMIN_PASSWORD.to_string());
    config.rate_limit.enabled = false;
    config
}

async fn app_with(config: Config) -> Router {
    let db = questlog::db::init(&config.database).await.unwrap();
    ensure_admin_user(&db, &config.auth).await.unwrap();
    create_router(Arc::new(AppState::new(config, db)))
}

async fn app() -> Router {
    app_with(test_config()).await
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

async fn register(app: &Router, name: &str, email: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": name, "email": email, "password": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    body
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["access_token"].as_str().unwrap().to_string()
}

/// Register a player and return (user id, token)
async fn player(app: &Router, name: &str) -> (i64, String) {
    let email = format!("{}@questlog.test", name.to_lowercase());
    let user = register(app, name, &email).await;
    let token = login(app, &email, "password1").await;
    (user["id"].as_i64().unwrap(), token)
}

async fn admin_token(app: &Router) -> String {
    login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

/// Create a genre, a developer and a game; returns (genre, developer, game) ids
async fn catalog(app: &Router, token: &str, title: &str) -> (i64, i64, i64) {
    let (_, genre) = send(
        app,
        Method::POST,
        "/api/genres",
        Some(token),
        Some(json!({ "name": format!("{} Genre", title) })),
    )
    .await;
    let (_, developer) = send(
        app,
        Method::POST,
        "/api/developers",
        Some(token),
        Some(json!({ "name": format!("{} Studio", title) })),
    )
    .await;

    let genre_id = genre["id"].as_i64().unwrap();
    let developer_id = developer["id"].as_i64().unwrap();

    let (status, game) = send(
        app,
        Method::POST,
        "/api/games",
        Some(token),
        Some(json!({
            "title": title,
            "description": "A test game",
            "release_date": "2020-01-15",
            "genre_id": genre_id,
            "developer_id": developer_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "game creation failed: {}", game);

    (genre_id, developer_id, game["id"].as_i64().unwrap())
}

#[tokio::test]
async fn test_health_check() {
    let app = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = app().await;

    let user = register(&app, "Alice", "Alice@Questlog.test").await;
    assert_eq!(user["email"], "alice@questlog.test");
    assert_eq!(user["is_admin"], false);
    assert!(user.get("password_hash").is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "alice@questlog.test", "password": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["message"], "Login successful, welcome back Alice");
    assert_eq!(body["expires_in"], 24 * 3600);
    let token = body["access_token"].as_str().unwrap();

    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user["id"]);
    assert_eq!(me["achievements"], json!([]));
    assert_eq!(me["scores"], json!([]));
    assert_eq!(me["sessions"], json!([]));
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let app = app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "", "email": "not-an-email", "password": "123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    let details = &body["error"]["details"];
    assert!(details.get("name").is_some());
    assert!(details.get("email").is_some());
    assert!(details.get("password").is_some());

    register(&app, "Bob", "bob@questlog.test").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Bobby", "email": "bob@questlog.test", "password": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let app = app().await;
    register(&app, "Carol", "carol@questlog.test").await;

    for (email, password) in [
        ("carol@questlog.test", "wrong-password"),
        ("nobody@questlog.test", "password1"),
    ] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["message"], "Invalid credentials");
    }
}

#[tokio::test]
async fn test_protected_routes_require_a_valid_token() {
    let app = app().await;

    let (status, body) = send(&app, Method::GET, "/api/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");

    let (status, _) = send(&app, Method::GET, "/api/sessions", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/genres",
        None,
        Some(json!({ "name": "Puzzle" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Catalog reads stay public
    let (status, body) = send(&app, Method::GET, "/api/genres", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_token_of_deleted_user_is_rejected() {
    let app = app().await;
    let (id, token) = player(&app, "Dave").await;

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/users/{}", id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_game_requires_existing_parents() {
    let app = app().await;
    let (_, token) = player(&app, "Erin").await;
    let (genre_id, developer_id, game_id) = catalog(&app, &token, "Starfall").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/games",
        Some(&token),
        Some(json!({ "title": "Orphan", "genre_id": 9999, "developer_id": developer_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Genre not found");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/games/{}", game_id),
        Some(&token),
        Some(json!({ "developer_id": 9999 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Developer not found");

    let (status, game) = send(&app, Method::GET, &format!("/api/games/{}", game_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(game["title"], "Starfall");
    assert_eq!(game["genre"]["id"], genre_id);
    assert_eq!(game["developer"]["id"], developer_id);
    assert_eq!(game["scores"], json!([]));

    let (status, genre) = send(&app, Method::GET, &format!("/api/genres/{}", genre_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(genre["games"][0]["id"], game_id);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/games",
        Some(&token),
        Some(json!({
            "title": "Bad Date",
            "release_date": "15/01/2020",
            "genre_id": genre_id,
            "developer_id": developer_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_duplicate_catalog_names_conflict() {
    let app = app().await;
    let (_, token) = player(&app, "Frank").await;

    let genre = json!({ "name": "Roguelike" });
    let (status, _) = send(&app, Method::POST, "/api/genres", Some(&token), Some(genre.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::POST, "/api/genres", Some(&token), Some(genre)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["message"], "A genre with this name already exists");
}

#[tokio::test]
async fn test_delete_genre_in_use_conflicts() {
    let app = app().await;
    let (_, token) = player(&app, "Gina").await;
    let (genre_id, _, game_id) = catalog(&app, &token, "Ironclad").await;

    let genre_uri = format!("/api/genres/{}", genre_id);
    let (status, _) = send(&app, Method::DELETE, &genre_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/games/{}", game_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Game deleted successfully");

    let (status, body) = send(&app, Method::DELETE, &genre_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Genre deleted successfully");

    let (status, _) = send(&app, Method::GET, &genre_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sessions_are_owner_scoped() {
    let app = app().await;
    let (_, alice) = player(&app, "Hana").await;
    let (_, bob) = player(&app, "Ivan").await;
    let (_, _, game_id) = catalog(&app, &alice, "Dungeon").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/sessions",
        Some(&alice),
        Some(json!({
            "game_id": game_id,
            "start_time": "2024-05-01T10:00:00Z",
            "end_time": "2024-05-01T09:00:00Z",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"].get("end_time").is_some());

    let (status, session) = send(
        &app,
        Method::POST,
        "/api/sessions",
        Some(&alice),
        Some(json!({ "game_id": game_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(session["end_time"].is_null());
    let session_uri = format!("/api/sessions/{}", session["id"]);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/sessions",
        Some(&alice),
        Some(json!({ "game_id": 9999 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, mine) = send(&app, Method::GET, "/api/sessions", Some(&alice), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    let (_, theirs) = send(&app, Method::GET, "/api/sessions", Some(&bob), None).await;
    assert_eq!(theirs, json!([]));

    let (status, _) = send(&app, Method::GET, &session_uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &session_uri,
        Some(&bob),
        Some(json!({ "end_time": "2099-01-01T00:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, ended) = send(
        &app,
        Method::PATCH,
        &session_uri,
        Some(&alice),
        Some(json!({ "end_time": "2099-01-01T00:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ended["end_time"].as_str().unwrap().starts_with("2099-01-01"));

    let (status, _) = send(&app, Method::DELETE, &session_uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_bypasses_ownership() {
    let app = app().await;
    let (_, player_token) = player(&app, "Jules").await;
    let admin = admin_token(&app).await;
    let (_, _, game_id) = catalog(&app, &player_token, "Skyline").await;

    let (_, score) = send(
        &app,
        Method::POST,
        "/api/scores",
        Some(&player_token),
        Some(json!({ "value": 500, "game_id": game_id })),
    )
    .await;
    let score_uri = format!("/api/scores/{}", score["id"]);

    let (status, updated) = send(
        &app,
        Method::PUT,
        &score_uri,
        Some(&admin),
        Some(json!({ "value": 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["value"], 50);

    let (status, _) = send(&app, Method::DELETE, &score_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_scores_filter_and_validation() {
    let app = app().await;
    let (user_id, token) = player(&app, "Kim").await;
    let (_, _, first) = catalog(&app, &token, "Alpha").await;
    let (_, _, second) = catalog(&app, &token, "Beta").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/scores",
        Some(&token),
        Some(json!({ "value": -5, "game_id": first })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for (value, game) in [(10, first), (20, first), (30, second)] {
        let (status, score) = send(
            &app,
            Method::POST,
            "/api/scores",
            Some(&token),
            Some(json!({ "value": value, "game_id": game })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(score["user"]["id"], user_id);
        assert!(score["date_achieved"].is_string());
    }

    let (_, all) = send(&app, Method::GET, "/api/scores", Some(&token), None).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let (_, filtered) = send(
        &app,
        Method::GET,
        &format!("/api/scores?game_id={}", first),
        Some(&token),
        None,
    )
    .await;
    let filtered = filtered.as_array().unwrap();
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|s| s["game"]["id"] == first));
}

#[tokio::test]
async fn test_leaderboard_ranks_highest_first() {
    let app = app().await;
    let (_, ana) = player(&app, "Ana").await;
    let (_, ben) = player(&app, "Ben").await;
    let (_, _, game_id) = catalog(&app, &ana, "Arena").await;

    for (token, value) in [(&ana, 300), (&ben, 900), (&ana, 600)] {
        send(
            &app,
            Method::POST,
            "/api/scores",
            Some(token),
            Some(json!({ "value": value, "game_id": game_id })),
        )
        .await;
    }

    let uri = format!("/api/games/{}/leaderboard", game_id);
    let (status, board) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let values: Vec<i64> = board
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["value"].as_i64().unwrap())
        .collect();
    assert_eq!(values, vec![900, 600, 300]);
    assert_eq!(board[0]["rank"], 1);
    assert_eq!(board[0]["user"]["name"], "Ben");

    let (_, top) = send(&app, Method::GET, &format!("{}?limit=1", uri), None, None).await;
    assert_eq!(top.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, Method::GET, &format!("{}?limit=500", uri), None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/api/games/9999/leaderboard", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_achievements_award_rules() {
    let app = app().await;
    let (alice_id, alice) = player(&app, "Lena").await;
    let (bob_id, bob) = player(&app, "Milo").await;
    let admin = admin_token(&app).await;
    let (_, _, game_id) = catalog(&app, &alice, "Quest").await;

    let (status, own) = send(
        &app,
        Method::POST,
        "/api/achievements",
        Some(&alice),
        Some(json!({ "name": "First Blood", "description": "Win a match", "game_id": game_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(own["user"]["id"], alice_id);
    assert_eq!(own["game"]["id"], game_id);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/achievements",
        Some(&alice),
        Some(json!({
            "name": "Gift",
            "description": "Given away",
            "game_id": game_id,
            "user_id": bob_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, awarded) = send(
        &app,
        Method::POST,
        "/api/achievements",
        Some(&admin),
        Some(json!({
            "name": "Gift",
            "description": "Given away",
            "game_id": game_id,
            "user_id": bob_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(awarded["user"]["id"], bob_id);

    let own_uri = format!("/api/achievements/{}", own["id"]);
    let (status, _) = send(
        &app,
        Method::PATCH,
        &own_uri,
        Some(&bob),
        Some(json!({ "description": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, renamed) = send(
        &app,
        Method::PATCH,
        &own_uri,
        Some(&alice),
        Some(json!({ "description": "Win your first match" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["description"], "Win your first match");
    assert_eq!(renamed["name"], "First Blood");

    let (status, list) = send(&app, Method::GET, "/api/achievements", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_user_updates_are_owner_only() {
    let app = app().await;
    let (alice_id, alice) = player(&app, "Nora").await;
    let (_, bob) = player(&app, "Otto").await;
    let uri = format!("/api/users/{}", alice_id);

    let (status, _) = send(&app, Method::PUT, &uri, Some(&bob), Some(json!({ "name": "Hacked" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&alice),
        Some(json!({ "name": "Nora B.", "password": "new-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Nora B.");

    // The new password is the one that works now
    login(&app, "nora@questlog.test", "new-password").await;

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::GET, "/api/users/9999", Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_user_cascades_to_their_records() {
    let app = app().await;
    let (user_id, token) = player(&app, "Pia").await;
    let admin = admin_token(&app).await;
    let (_, _, game_id) = catalog(&app, &admin, "Cascade").await;

    send(
        &app,
        Method::POST,
        "/api/scores",
        Some(&token),
        Some(json!({ "value": 42, "game_id": game_id })),
    )
    .await;
    send(
        &app,
        Method::POST,
        "/api/sessions",
        Some(&token),
        Some(json!({ "game_id": game_id })),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/users/{}", user_id),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully");

    let (_, game) = send(&app, Method::GET, &format!("/api/games/{}", game_id), None, None).await;
    assert_eq!(game["scores"], json!([]));
    assert_eq!(game["sessions"], json!([]));
}

#[tokio::test]
async fn test_auth_endpoints_are_rate_limited() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.auth_requests_per_window = 2;
    let app = app_with(config).await;

    let credentials = json!({ "email": "nobody@questlog.test", "password": "whatever" });
    for _ in 0..2 {
        let (status, _) = send(
            &app,
            Method::POST,
            "/api/auth/login",
            None,
            Some(credentials.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(credentials.to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    // Resource endpoints draw from their own budget
    let (status, _) = send(&app, Method::GET, "/api/genres", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rotating_forwarded_header_does_not_reset_auth_budget() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.auth_requests_per_window = 2;
    let app = app_with(config).await;

    let credentials = json!({ "email": "nobody@questlog.test", "password": "whatever" });
    let mut statuses = Vec::new();
    for i in 0..6 {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", format!("198.51.100.{}", i))
            .header("x-real-ip", format!("203.0.113.{}", i))
            .body(Body::from(credentials.to_string()))
            .unwrap();
        statuses.push(app.clone().oneshot(request).await.unwrap().status());
    }

    assert_eq!(&statuses[..2], &[StatusCode::UNAUTHORIZED; 2]);
    assert!(statuses[2..]
        .iter()
        .all(|s| *s == StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn test_forwarded_header_is_honored_when_trusted() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.auth_requests_per_window = 1;
    config.rate_limit.trust_proxy_headers = true;
    let app = app_with(config).await;

    let credentials = json!({ "email": "nobody@questlog.test", "password": "whatever" });
    let login_from = |ip: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(credentials.to_string()))
            .unwrap()
    };

    let first = app.clone().oneshot(login_from("198.51.100.1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);
    let again = app.clone().oneshot(login_from("198.51.100.1")).await.unwrap();
    assert_eq!(again.status(), StatusCode::TOO_MANY_REQUESTS);
    let other = app.clone().oneshot(login_from("198.51.100.2")).await.unwrap();
    assert_eq!(other.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_deleting_game_cascades_to_activity() {
    let app = app().await;
    let (_, token) = player(&app, "Quinn").await;
    let (_, _, game_id) = catalog(&app, &token, "Ephemeral").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/scores",
        Some(&token),
        Some(json!({ "value": 1200, "game_id": game_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/sessions",
        Some(&token),
        Some(json!({ "game_id": game_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(
        &app,
        Method::POST,
        "/api/achievements",
        Some(&token),
        Some(json!({ "name": "Speedrunner", "description": "Under an hour", "game_id": game_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/games/{}", game_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, scores) = send(&app, Method::GET, "/api/scores", Some(&token), None).await;
    assert_eq!(scores, json!([]));
    let (_, sessions) = send(&app, Method::GET, "/api/sessions", Some(&token), None).await;
    assert_eq!(sessions, json!([]));
    let (_, achievements) = send(&app, Method::GET, "/api/achievements", None, None).await;
    assert_eq!(achievements, json!([]));
}

#[tokio::test]
async fn test_delete_developer_in_use_conflicts() {
    let app = app().await;
    let (_, token) = player(&app, "Rhea").await;
    let (_, developer_id, game_id) = catalog(&app, &token, "Monolith").await;

    let developer_uri = format!("/api/developers/{}", developer_id);
    let (status, body) = send(&app, Method::DELETE, &developer_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    send(
        &app,
        Method::DELETE,
        &format!("/api/games/{}", game_id),
        Some(&token),
        None,
    )
    .await;

    let (status, body) = send(&app, Method::DELETE, &developer_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Developer deleted successfully");
}

#[tokio::test]
async fn test_health_reports_unavailable_database() {
    let config = test_config();
    let db = questlog::db::init(&config.database).await.unwrap();
    let state = Arc::new(AppState::new(config, db));
    let app = create_router(state.clone());

    state.db.close().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "service_unavailable");
}

#[tokio::test]
async fn test_explicit_null_clears_optional_fields() {
    let app = app().await;
    let (_, token) = player(&app, "Sven").await;
    let (_, _, game_id) = catalog(&app, &token, "Blank Slate").await;
    let game_uri = format!("/api/games/{}", game_id);

    let (status, game) = send(
        &app,
        Method::PATCH,
        &game_uri,
        Some(&token),
        Some(json!({ "description": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(game["description"].is_null());
    assert_eq!(game["release_date"], "2020-01-15");

    let (status, game) = send(
        &app,
        Method::PATCH,
        &game_uri,
        Some(&token),
        Some(json!({ "title": "Blank Slate II" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(game["description"].is_null());
    assert_eq!(game["release_date"], "2020-01-15");

    let (_, session) = send(
        &app,
        Method::POST,
        "/api/sessions",
        Some(&token),
        Some(json!({
            "game_id": game_id,
            "start_time": "2024-05-01T10:00:00Z",
            "end_time": "2024-05-01T11:00:00Z",
        })),
    )
    .await;
    let session_uri = format!("/api/sessions/{}", session["id"]);

    let (status, reopened) = send(
        &app,
        Method::PATCH,
        &session_uri,
        Some(&token),
        Some(json!({ "end_time": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(reopened["end_time"].is_null());
    assert!(reopened["start_time"]
        .as_str()
        .unwrap()
        .starts_with("2024-05-01T10:00:00"));
}

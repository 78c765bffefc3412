//! JWT authentication: token issuance, the guard middleware for protected
//! routes, the current-user extractor, and the register/login/me handlers.

use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::error::{ApiError, ValidationErrorBuilder};
use super::extract::ApiJson;
use super::validation::{validate_email, validate_password, validate_user_name};
use crate::config::{AuthConfig, MAX_TOKEN_TTL_HOURS};
use crate::crypto::{hash_password, verify_password};
use crate::db::{
    DbPool, LoginRequest, LoginResponse, RegisterRequest, User, UserDetailResponse, UserResponse,
};
use crate::AppState;

/// Failures while reading or checking a bearer token
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Authorization header must use the Bearer scheme")]
    MalformedHeader,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("Token subject is not a user id")]
    InvalidSubject,
    #[error("Token user no longer exists")]
    UnknownUser,
    #[error("Failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
    #[error("Token expiry is out of range")]
    ExpiryOutOfRange,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(source) => {
                tracing::error!("Failed to sign access token: {}", source);
                ApiError::internal("Failed to issue access token")
            }
            AuthError::ExpiryOutOfRange => {
                tracing::error!("Access token expiry overflows the clock");
                ApiError::internal("Failed to issue access token")
            }
            other => {
                debug!("Rejected credentials: {}", other);
                ApiError::unauthorized(other.to_string())
            }
        }
    }
}

/// Registered claims carried in every access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a string per RFC 7519
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
}

/// HS256 signing and verification keys plus the token lifetime
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    /// Build keys from config. Without a configured secret a random one is
    /// generated, so tokens do not survive a restart.
    pub fn from_config(config: &AuthConfig) -> Self {
        let ttl = Duration::hours(config.token_ttl_hours.clamp(1, MAX_TOKEN_TTL_HOURS));
        match config.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Self::new(secret.as_bytes(), ttl),
            _ => {
                warn!(
                    "No JWT secret configured; using a random one. \
                     Issued tokens will be invalid after a restart."
                );
                let secret = format!(
                    "{}{}",
                    uuid::Uuid::new_v4().simple(),
                    uuid::Uuid::new_v4().simple()
                );
                Self::new(secret.as_bytes(), ttl)
            }
        }
    }

    /// Lifetime of issued tokens in seconds
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn issue(&self, user_id: i64) -> Result<String, AuthError> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or(AuthError::ExpiryOutOfRange)?;
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(AuthError::Signing)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e),
            })
    }
}

/// Pull the token out of `Authorization: Bearer <token>`
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::MalformedHeader),
    }
}

/// Resolve the user behind the request's bearer token
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = bearer_token(headers)?;
    let claims = state.jwt.decode(token)?;
    let user_id: i64 = claims.sub.parse().map_err(|_| AuthError::InvalidSubject)?;

    let user = User::get_by_id(&state.db, user_id)
        .await?
        .ok_or(AuthError::UnknownUser)?;
    Ok(user)
}

/// Guard for protected routes. Stores the authenticated user in the request
/// extensions for the `User` extractor.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for the current authenticated user
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(user.clone());
        }
        authenticate(state, &parts.headers).await
    }
}

/// Allow the action when the caller owns the resource or is an admin
pub fn ensure_owner(user: &User, owner_id: i64) -> Result<(), ApiError> {
    if user.id == owner_id || user.is_admin() {
        Ok(())
    } else {
        warn!(user_id = %user.id, owner_id = %owner_id, "Ownership check failed");
        Err(ApiError::forbidden(
            "You do not have permission to modify this resource",
        ))
    }
}

pub fn ensure_admin(user: &User) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::forbidden("Administrator privileges required"))
    }
}

/// Create the configured bootstrap administrator if it does not exist yet
pub async fn ensure_admin_user(db: &DbPool, config: &AuthConfig) -> anyhow::Result<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    let email = email.trim().to_lowercase();
    if let Some(existing) = User::get_by_email(db, &email).await? {
        if !existing.is_admin() {
            warn!(
                user_id = %existing.id,
                "Configured admin email {} belongs to a regular account; \
                 no administrator was created",
                email
            );
        }
        return Ok(());
    }

    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;
    let user = User::create(db, "Administrator", &email, &password_hash, true).await?;
    info!(user_id = %user.id, "Created bootstrap admin user {}", email);
    Ok(())
}

// -------------------------------------------------------------------------
// Handlers
// -------------------------------------------------------------------------

/// Register a new account
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let name = req.name.trim();
    let email = req.email.trim().to_lowercase();

    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("name", validate_user_name(name))
        .check("email", validate_email(&email))
        .check("password", validate_password(&req.password));
    errors.finish()?;

    if User::get_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let user = User::create(&state.db, name, &email, &password_hash, false)
        .await
        .map_err(|e| ApiError::on_unique(e, "Email already registered"))?;

    info!(user_id = %user.id, "Registered user {}", user.email);
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Exchange credentials for an access token
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = req.email.trim().to_lowercase();

    let user = match User::get_by_email(&state.db, &email).await? {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        _ => {
            warn!("Failed login attempt for {}", email);
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    let access_token = state.jwt.issue(user.id)?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        message: format!("Login successful, welcome back {}", user.name),
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.ttl_seconds(),
        user: UserResponse::from(user),
    }))
}

/// The authenticated user with everything they have recorded
pub async fn me(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<UserDetailResponse>, ApiError> {
    Ok(Json(UserDetailResponse::load(&state.db, user).await?))
}

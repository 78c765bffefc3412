//! Play sessions. A session with no `end_time` is still in progress.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::{double_option, Game, User, UserResponse};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: i64,
    pub start_time: String,
    pub end_time: Option<String>,
    pub user_id: i64,
    pub game_id: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub id: i64,
    pub start_time: String,
    pub end_time: Option<String>,
    pub user: UserResponse,
    pub game: Game,
}

impl SessionResponse {
    pub async fn load(db: &SqlitePool, session: Session) -> Result<Self, sqlx::Error> {
        let user = User::get_by_id(db, session.user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        let game = Game::get_by_id(db, session.game_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        Ok(Self {
            id: session.id,
            start_time: session.start_time,
            end_time: session.end_time,
            user: UserResponse::from(user),
            game,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub game_id: i64,
    /// RFC 3339 timestamp; defaults to now
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Partial update. An explicit `null` end time reopens the session.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSessionRequest {
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub end_time: Option<Option<String>>,
}

impl Session {
    pub async fn create(
        db: &SqlitePool,
        user_id: i64,
        game_id: i64,
        start_time: &str,
        end_time: Option<&str>,
    ) -> Result<Session, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO sessions (start_time, end_time, user_id, game_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(start_time)
        .bind(end_time)
        .bind(user_id)
        .bind(game_id)
        .bind(&now)
        .execute(db)
        .await?;

        Self::get_by_id(db, result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(db: &SqlitePool, id: i64) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_for_user(db: &SqlitePool, user_id: i64) -> Result<Vec<Session>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sessions WHERE user_id = ? ORDER BY start_time DESC")
            .bind(user_id)
            .fetch_all(db)
            .await
    }

    pub async fn list_for_game(db: &SqlitePool, game_id: i64) -> Result<Vec<Session>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM sessions WHERE game_id = ? ORDER BY start_time DESC")
            .bind(game_id)
            .fetch_all(db)
            .await
    }

    pub async fn update(
        db: &SqlitePool,
        id: i64,
        start_time: Option<&str>,
        end_time: Option<Option<&str>>,
    ) -> Result<Session, sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE sessions SET
                start_time = COALESCE(?, start_time),
                end_time = CASE WHEN ? THEN ? ELSE end_time END
            WHERE id = ?
            "#,
        )
        .bind(start_time)
        .bind(end_time.is_some())
        .bind(end_time.flatten())
        .bind(id)
        .execute(db)
        .await?;

        Self::get_by_id(db, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

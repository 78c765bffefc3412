use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::{Game, User, UserResponse};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Score {
    pub id: i64,
    pub value: i64,
    /// Set by the server when the score is recorded
    pub date_achieved: String,
    pub user_id: i64,
    pub game_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreResponse {
    pub id: i64,
    pub value: i64,
    pub date_achieved: String,
    pub user: UserResponse,
    pub game: Game,
}

impl ScoreResponse {
    pub async fn load(db: &SqlitePool, score: Score) -> Result<Self, sqlx::Error> {
        let user = User::get_by_id(db, score.user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        let game = Game::get_by_id(db, score.game_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        Ok(Self {
            id: score.id,
            value: score.value,
            date_achieved: score.date_achieved,
            user: UserResponse::from(user),
            game,
        })
    }
}

/// One row of a game's leaderboard
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub score_id: i64,
    pub value: i64,
    pub date_achieved: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct CreateScoreRequest {
    pub value: i64,
    pub game_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateScoreRequest {
    pub value: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScoreQuery {
    pub game_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

impl Score {
    pub async fn create(
        db: &SqlitePool,
        user_id: i64,
        game_id: i64,
        value: i64,
    ) -> Result<Score, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO scores (value, date_achieved, user_id, game_id) VALUES (?, ?, ?, ?)",
        )
        .bind(value)
        .bind(&now)
        .bind(user_id)
        .bind(game_id)
        .execute(db)
        .await?;

        Self::get_by_id(db, result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(db: &SqlitePool, id: i64) -> Result<Option<Score>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM scores WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Scores recorded by a user, newest first, optionally narrowed to one game
    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: i64,
        game_id: Option<i64>,
    ) -> Result<Vec<Score>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM scores
            WHERE user_id = ? AND (? IS NULL OR game_id = ?)
            ORDER BY date_achieved DESC, id DESC
            "#,
        )
        .bind(user_id)
        .bind(game_id)
        .bind(game_id)
        .fetch_all(db)
        .await
    }

    pub async fn list_for_game(db: &SqlitePool, game_id: i64) -> Result<Vec<Score>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM scores WHERE game_id = ? ORDER BY value DESC, id ASC")
            .bind(game_id)
            .fetch_all(db)
            .await
    }

    /// Highest scores for a game; ties go to whoever got there first
    pub async fn top_for_game(
        db: &SqlitePool,
        game_id: i64,
        limit: i64,
    ) -> Result<Vec<Score>, sqlx::Error> {
        sqlx::query_as(
            r#"
            SELECT * FROM scores
            WHERE game_id = ?
            ORDER BY value DESC, date_achieved ASC, id ASC
            LIMIT ?
            "#,
        )
        .bind(game_id)
        .bind(limit)
        .fetch_all(db)
        .await
    }

    pub async fn update(db: &SqlitePool, id: i64, value: Option<i64>) -> Result<Score, sqlx::Error> {
        sqlx::query("UPDATE scores SET value = COALESCE(?, value) WHERE id = ?")
            .bind(value)
            .bind(id)
            .execute(db)
            .await?;

        Self::get_by_id(db, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM scores WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

//! Game catalog entries and their nested representation.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::{double_option, Achievement, Developer, Genre, Score, Session};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Game {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// ISO date (YYYY-MM-DD)
    pub release_date: Option<String>,
    pub genre_id: i64,
    pub developer_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A game with its parents and the activity recorded against it.
/// Child rows carry only ids, so nothing nests back into the game.
#[derive(Debug, Clone, Serialize)]
pub struct GameResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub release_date: Option<String>,
    pub genre: Genre,
    pub developer: Developer,
    pub sessions: Vec<Session>,
    pub scores: Vec<Score>,
    pub achievements: Vec<Achievement>,
}

impl GameResponse {
    pub async fn load(db: &SqlitePool, game: Game) -> Result<Self, sqlx::Error> {
        let genre = Genre::get_by_id(db, game.genre_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        let developer = Developer::get_by_id(db, game.developer_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        let sessions = Session::list_for_game(db, game.id).await?;
        let scores = Score::list_for_game(db, game.id).await?;
        let achievements = Achievement::list_for_game(db, game.id).await?;

        Ok(Self {
            id: game.id,
            title: game.title,
            description: game.description,
            release_date: game.release_date,
            genre,
            developer,
            sessions,
            scores,
            achievements,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    pub title: String,
    pub description: Option<String>,
    pub release_date: Option<String>,
    pub genre_id: i64,
    pub developer_id: i64,
}

/// Partial update. `description` and `release_date` are cleared by an
/// explicit `null` and left alone when absent.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateGameRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub release_date: Option<Option<String>>,
    pub genre_id: Option<i64>,
    pub developer_id: Option<i64>,
}

impl Game {
    pub async fn create(db: &SqlitePool, req: &CreateGameRequest) -> Result<Game, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO games (title, description, release_date, genre_id, developer_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.release_date)
        .bind(req.genre_id)
        .bind(req.developer_id)
        .bind(&now)
        .bind(&now)
        .execute(db)
        .await?;

        Self::get_by_id(db, result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(db: &SqlitePool, id: i64) -> Result<Option<Game>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM games WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &SqlitePool) -> Result<Vec<Game>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM games ORDER BY title ASC")
            .fetch_all(db)
            .await
    }

    pub async fn list_for_genre(db: &SqlitePool, genre_id: i64) -> Result<Vec<Game>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM games WHERE genre_id = ? ORDER BY title ASC")
            .bind(genre_id)
            .fetch_all(db)
            .await
    }

    pub async fn list_for_developer(
        db: &SqlitePool,
        developer_id: i64,
    ) -> Result<Vec<Game>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM games WHERE developer_id = ? ORDER BY title ASC")
            .bind(developer_id)
            .fetch_all(db)
            .await
    }

    pub async fn exists(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM games WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row.is_some())
    }

    pub async fn update(
        db: &SqlitePool,
        id: i64,
        req: &UpdateGameRequest,
    ) -> Result<Game, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            UPDATE games SET
                title = COALESCE(?, title),
                description = CASE WHEN ? THEN ? ELSE description END,
                release_date = CASE WHEN ? THEN ? ELSE release_date END,
                genre_id = COALESCE(?, genre_id),
                developer_id = COALESCE(?, developer_id),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&req.title)
        .bind(req.description.is_some())
        .bind(req.description.clone().flatten())
        .bind(req.release_date.is_some())
        .bind(req.release_date.clone().flatten())
        .bind(req.genre_id)
        .bind(req.developer_id)
        .bind(&now)
        .bind(id)
        .execute(db)
        .await?;

        Self::get_by_id(db, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM games WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

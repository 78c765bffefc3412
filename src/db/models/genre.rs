use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::Game;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Genre {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenreResponse {
    pub id: i64,
    pub name: String,
    pub games: Vec<Game>,
}

impl GenreResponse {
    pub async fn load(db: &SqlitePool, genre: Genre) -> Result<Self, sqlx::Error> {
        let games = Game::list_for_genre(db, genre.id).await?;
        Ok(Self {
            id: genre.id,
            name: genre.name,
            games,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateGenreRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGenreRequest {
    pub name: Option<String>,
}

impl Genre {
    pub async fn create(db: &SqlitePool, name: &str) -> Result<Genre, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO genres (name, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(&now)
        .bind(&now)
        .execute(db)
        .await?;

        Self::get_by_id(db, result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(db: &SqlitePool, id: i64) -> Result<Option<Genre>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM genres WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &SqlitePool) -> Result<Vec<Genre>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM genres ORDER BY name ASC")
            .fetch_all(db)
            .await
    }

    pub async fn exists(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM genres WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row.is_some())
    }

    pub async fn update(db: &SqlitePool, id: i64, name: Option<&str>) -> Result<Genre, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query("UPDATE genres SET name = COALESCE(?, name), updated_at = ? WHERE id = ?")
            .bind(name)
            .bind(&now)
            .bind(id)
            .execute(db)
            .await?;

        Self::get_by_id(db, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM genres WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn game_count(db: &SqlitePool, id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM games WHERE genre_id = ?")
            .bind(id)
            .fetch_one(db)
            .await?;
        Ok(count)
    }
}

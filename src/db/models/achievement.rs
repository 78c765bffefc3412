use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::{Game, User, UserResponse};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Achievement {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub user_id: i64,
    pub game_id: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AchievementResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub user: UserResponse,
    pub game: Game,
    pub created_at: String,
}

impl AchievementResponse {
    pub async fn load(db: &SqlitePool, achievement: Achievement) -> Result<Self, sqlx::Error> {
        let user = User::get_by_id(db, achievement.user_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        let game = Game::get_by_id(db, achievement.game_id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;

        Ok(Self {
            id: achievement.id,
            name: achievement.name,
            description: achievement.description,
            user: UserResponse::from(user),
            game,
            created_at: achievement.created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAchievementRequest {
    pub name: String,
    pub description: String,
    pub game_id: i64,
    /// Recipient; defaults to the caller
    pub user_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAchievementRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Achievement {
    pub async fn create(
        db: &SqlitePool,
        name: &str,
        description: &str,
        user_id: i64,
        game_id: i64,
    ) -> Result<Achievement, sqlx::Error> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO achievements (name, description, user_id, game_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(user_id)
        .bind(game_id)
        .bind(&now)
        .execute(db)
        .await?;

        Self::get_by_id(db, result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn get_by_id(db: &SqlitePool, id: i64) -> Result<Option<Achievement>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM achievements WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list(db: &SqlitePool) -> Result<Vec<Achievement>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM achievements ORDER BY id ASC")
            .fetch_all(db)
            .await
    }

    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: i64,
    ) -> Result<Vec<Achievement>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM achievements WHERE user_id = ? ORDER BY id ASC")
            .bind(user_id)
            .fetch_all(db)
            .await
    }

    pub async fn list_for_game(
        db: &SqlitePool,
        game_id: i64,
    ) -> Result<Vec<Achievement>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM achievements WHERE game_id = ? ORDER BY id ASC")
            .bind(game_id)
            .fetch_all(db)
            .await
    }

    pub async fn update(
        db: &SqlitePool,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Achievement, sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE achievements SET
                name = COALESCE(?, name),
                description = COALESCE(?, description)
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(description)
        .bind(id)
        .execute(db)
        .await?;

        Self::get_by_id(db, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM achievements WHERE id = ?")
            .bind(id)
            .execute(db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

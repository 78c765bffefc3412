//! Demo data for local development
//!
//! Populates a fresh database with a handful of genres, developers, games and
//! two accounts so the API can be explored right away. Safe to run repeatedly.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::info;

use crate::crypto::hash_password;

const GENRES: [&str; 4] = ["Action", "Adventure", "RPG", "Strategy"];

const DEVELOPERS: [&str; 3] = ["Epic Games", "Blizzard Entertainment", "Ubisoft"];

// (title, genre, developer)
const GAMES: [(&str, &str, &str); 3] = [
    ("Fortnite", "Action", "Epic Games"),
    ("Overwatch", "Adventure", "Blizzard Entertainment"),
    ("Assassin's Creed", "RPG", "Ubisoft"),
];

// (name, email, password, is_admin)
const USERS: [(&str, &str, &str, bool); 2] = [
    ("Admin User", "admin@example.com", "admin123", true),
    ("Player One", "player1@example.com", "player123", false),
];

/// Seed demo catalog entries and accounts; existing rows are left alone
pub async fn seed_demo_data(pool: &SqlitePool) -> Result<()> {
    info!("Seeding demo data...");
    let now = chrono::Utc::now().to_rfc3339();

    for name in GENRES {
        sqlx::query("INSERT OR IGNORE INTO genres (name, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(&now)
            .bind(&now)
            .execute(pool)
            .await?;
    }
    info!("Genres added to the database");

    for name in DEVELOPERS {
        sqlx::query(
            "INSERT OR IGNORE INTO developers (name, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(name)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
    }
    info!("Developers added to the database");

    for (title, genre, developer) in GAMES {
        let (genre_id,): (i64,) = sqlx::query_as("SELECT id FROM genres WHERE name = ?")
            .bind(genre)
            .fetch_one(pool)
            .await
            .with_context(|| format!("Seed genre '{}' is missing", genre))?;
        let (developer_id,): (i64,) = sqlx::query_as("SELECT id FROM developers WHERE name = ?")
            .bind(developer)
            .fetch_one(pool)
            .await
            .with_context(|| format!("Seed developer '{}' is missing", developer))?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO games (title, genre_id, developer_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(title)
        .bind(genre_id)
        .bind(developer_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
    }
    info!("Games added to the database");

    for (name, email, password, is_admin) in USERS {
        let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        if existing.is_some() {
            continue;
        }

        let password_hash = hash_password(password)
            .map_err(|e| anyhow::anyhow!("Failed to hash seed password: {}", e))?;

        sqlx::query(
            r#"
            INSERT INTO users (name, email, password_hash, is_admin, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(&password_hash)
        .bind(if is_admin { 1i64 } else { 0i64 })
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
    }
    info!("Users added to the database");

    info!("Database seeding completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::{init, Game, User};

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let pool = init(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        })
        .await
        .unwrap();

        seed_demo_data(&pool).await.unwrap();
        seed_demo_data(&pool).await.unwrap();

        let games = Game::list(&pool).await.unwrap();
        assert_eq!(games.len(), GAMES.len());

        let users = User::list(&pool).await.unwrap();
        assert_eq!(users.len(), USERS.len());

        let admin = User::get_by_email(&pool, "admin@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin());
        assert!(crate::crypto::verify_password("admin123", &admin.password_hash));
    }
}

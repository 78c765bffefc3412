mod models;
mod seeders;

pub use models::*;
pub use seeders::seed_demo_data;

use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use tracing::info;

use crate::config::DatabaseConfig;

pub type DbPool = SqlitePool;

/// Tables in dependency order, children first
const TABLES: [&str; 7] = [
    "achievements",
    "scores",
    "sessions",
    "games",
    "developers",
    "genres",
    "users",
];

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

/// Open a pool without touching the schema.
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .with_context(|| format!("Invalid database URL: {}", config.url))?
        .create_if_missing(true)
        .foreign_keys(true);

    let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");

    if !in_memory {
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
        }
    }

    // An in-memory database lives and dies with its single connection
    let pool = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal))
            .await?
    };

    Ok(pool)
}

/// Open the pool and bring the schema up to date.
pub async fn init(config: &DatabaseConfig) -> Result<DbPool> {
    info!("Initializing database at {}", config.url);

    let pool = connect(config).await?;
    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Initial schema
    let has_users_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='users'",
    )
    .fetch_optional(pool)
    .await?;
    if has_users_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}

/// Drop every application table.
pub async fn drop_all(pool: &SqlitePool) -> Result<()> {
    for table in TABLES {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await
            .with_context(|| format!("Failed to drop table {}", table))?;
    }
    info!("Dropped {} tables", TABLES.len());
    Ok(())
}

/// Cheap liveness probe used by the health endpoint.
pub async fn ping(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> DatabaseConfig {
        DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 5,
        }
    }

    async fn table_count(pool: &SqlitePool) -> i64 {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_one(pool)
        .await
        .unwrap();
        count
    }

    #[tokio::test]
    async fn test_init_creates_schema_and_is_idempotent() {
        let pool = init(&memory_config()).await.unwrap();
        assert_eq!(table_count(&pool).await, TABLES.len() as i64);

        run_migrations(&pool).await.unwrap();
        assert_eq!(table_count(&pool).await, TABLES.len() as i64);
        ping(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_all_removes_tables() {
        let pool = init(&memory_config()).await.unwrap();
        drop_all(&pool).await.unwrap();
        assert_eq!(table_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let pool = init(&memory_config()).await.unwrap();
        let result = sqlx::query(
            "INSERT INTO games (title, genre_id, developer_id, created_at, updated_at) VALUES ('x', 99, 99, '', '')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}

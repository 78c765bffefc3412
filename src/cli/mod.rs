//! Command-line interface.
//!
//! Without a subcommand (or with `serve`) the binary runs the HTTP server.
//! The remaining subcommands manage the database and configuration:
//! - `db create` - Apply the schema
//! - `db drop` - Drop every table
//! - `db seed` - Insert demo catalog data and accounts
//! - `config check` - Validate the configuration file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;
use crate::db;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "questlog")]
#[command(author, version, about = "Game achievements and leaderboards API", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "QUESTLOG_CONFIG", default_value = "questlog.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long, env = "QUESTLOG_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Override the database URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Override the token signing secret
    #[arg(long, env = "JWT_SECRET_KEY", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Subcommand to run (if none, starts the server)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Load the config file and apply flag / environment overrides
    pub fn load_config(&self) -> Result<Config> {
        let config = Config::load(&self.config)?;
        Ok(config.with_overrides(self.database_url.clone(), self.jwt_secret.clone()))
    }
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server (the default)
    Serve,

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Database subcommands
#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Create all tables
    Create,
    /// Drop all tables
    Drop,
    /// Populate the database with demo data
    Seed,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration file
    Check,
}

/// Run a non-server CLI command
pub async fn run_command(cli: &Cli, config: &Config) -> Result<()> {
    match &cli.command {
        Some(Commands::Db(DbCommands::Create)) => cmd_db_create(config).await,
        Some(Commands::Db(DbCommands::Drop)) => cmd_db_drop(config).await,
        Some(Commands::Db(DbCommands::Seed)) => cmd_db_seed(config).await,
        Some(Commands::Config(ConfigCommands::Check)) => cmd_config_check(cli, config),
        // Serving is handled in main.rs
        Some(Commands::Serve) | None => Ok(()),
    }
}

async fn cmd_db_create(config: &Config) -> Result<()> {
    let pool = db::init(&config.database).await?;
    pool.close().await;
    println!("[OK] Database tables created at {}", config.database.url);
    Ok(())
}

async fn cmd_db_drop(config: &Config) -> Result<()> {
    let pool = db::connect(&config.database).await?;
    db::drop_all(&pool)
        .await
        .context("Failed to drop tables")?;
    pool.close().await;
    println!("[OK] Database tables dropped");
    Ok(())
}

async fn cmd_db_seed(config: &Config) -> Result<()> {
    let pool = db::init(&config.database).await?;
    db::seed_demo_data(&pool).await?;
    pool.close().await;
    println!("[OK] Database seeded with demo data");
    Ok(())
}

fn cmd_config_check(cli: &Cli, config: &Config) -> Result<()> {
    println!("Checking configuration file: {}", cli.config.display());
    println!();

    if !cli.config.exists() {
        println!("[!!] Configuration file not found, defaults are in effect");
        println!("To customize, copy questlog.example.toml to questlog.toml");
        println!();
    } else {
        println!("[OK] Configuration file is valid!");
        println!();
    }

    let enabled = |flag: bool| if flag { "Enabled" } else { "Disabled" };

    println!("=== Configuration Summary ===");
    println!();
    println!("Server:");
    println!("  Address:        {}:{}", config.server.host, config.server.port);
    println!();
    println!("Database:");
    println!("  URL:            {}", config.database.url);
    println!("  Connections:    {}", config.database.max_connections);
    println!();
    println!("Auth:");
    println!(
        "  JWT Secret:     {}",
        if config.auth.jwt_secret.is_some() {
            "Configured"
        } else {
            "Random per process"
        }
    );
    println!("  Token TTL:      {}h", config.auth.token_ttl_hours);
    println!(
        "  Admin Account:  {}",
        config.auth.admin_email.as_deref().unwrap_or("(none)")
    );
    println!();
    println!("Rate Limiting:    {}", enabled(config.rate_limit.enabled));
    if config.rate_limit.enabled {
        println!(
            "  API:            {} req / {}s",
            config.rate_limit.api_requests_per_window, config.rate_limit.window_seconds
        );
        println!(
            "  Auth:           {} req / {}s",
            config.rate_limit.auth_requests_per_window, config.rate_limit.window_seconds
        );
        println!(
            "  Proxy headers:  {}",
            if config.rate_limit.trust_proxy_headers { "trusted" } else { "ignored" }
        );
    }
    println!();
    println!("Log Level:        {}", config.logging.level);

    if config.auth.jwt_secret.is_none() {
        println!();
        println!("[!!] Set auth.jwt_secret or JWT_SECRET_KEY so tokens survive restarts");
    }

    Ok(())
}

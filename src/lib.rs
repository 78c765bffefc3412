pub mod api;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod db;

pub use db::DbPool;

use config::Config;
use std::sync::Arc;

use crate::api::auth::JwtKeys;
use crate::api::rate_limit::RateLimiter;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub jwt: JwtKeys,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let jwt = JwtKeys::from_config(&config.auth);
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        Self {
            config,
            db,
            jwt,
            rate_limiter,
        }
    }
}

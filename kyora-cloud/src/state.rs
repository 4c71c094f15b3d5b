//! Application state for kyora-cloud

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::BoxError;
use crate::auth::rate_limit::RateLimiter;
use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// JWT secret for access tokens
    pub jwt_secret: String,
    /// Rate limiter for login/registration routes
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Connect, run migrations and build the state
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self::with_pool(pool, config.jwt_secret.clone()))
    }

    pub fn with_pool(pool: PgPool, jwt_secret: String) -> Self {
        Self {
            pool,
            jwt_secret,
            rate_limiter: RateLimiter::new(),
        }
    }
}

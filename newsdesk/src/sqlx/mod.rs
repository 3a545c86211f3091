use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use self::config::PgConfig;
pub use self::user::GoogleSignIn;

mod config;
mod user;
pub mod username;

#[derive(Clone)]
pub struct SqlxClient {
    pool: PgPool,
}

impl SqlxClient {
    pub fn new(pool: PgPool) -> SqlxClient {
        SqlxClient { pool }
    }

    /// Connects to PostgreSQL and applies the embedded migrations.
    pub async fn connect(db_url: &str, config: &PgConfig) -> anyhow::Result<SqlxClient> {
        tracing::info!("connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(config.db_pool_size)
            .connect(db_url)
            .await
            .context("failed to connect to PostgreSQL")?;
        tracing::info!("PostgreSQL connected");

        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;
        tracing::info!("database migrations complete");

        Ok(SqlxClient { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// First and last name separated by a space, trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Profile {
    pub user_id: i64,
    pub google_sub: String,
}

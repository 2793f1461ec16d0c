pub mod classifications;
pub mod memory;
pub mod settings;
pub mod subreddits;
pub mod tracked;
mod tests;

pub use memory::InMemoryCache;
pub use subreddits::StoredSubreddit;
pub use tracked::DEFAULT_TRACKED_COMMUNITIES;

use analytics_core::CacheError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

const MAX_CONNECTIONS: u32 = 5;

/// SQLite-backed store for classifications, subreddit records, the tracked
/// community list and settings.
///
/// Call [`Database::connect`] and [`Database::run_migrations`] before use;
/// every query fails with [`CacheError::NotConnected`] until then.
pub struct Database {
    connection_string: String,
    pool: Option<SqlitePool>,
}

impl Database {
    pub fn new(connection_string: String) -> Self {
        Self {
            connection_string,
            pool: None,
        }
    }

    pub async fn connect(&mut self) -> Result<(), CacheError> {
        let options = SqliteConnectOptions::from_str(&self.connection_string)
            .map_err(|e| CacheError::ConnectionFailed {
                reason: format!("invalid connection string: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| CacheError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        info!("Connected to database at {}", self.connection_string);
        self.pool = Some(pool);
        Ok(())
    }

    pub async fn run_migrations(&self) -> Result<(), CacheError> {
        let pool = self.pool()?;
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| CacheError::MigrationFailed {
                migration: e.to_string(),
            })?;
        debug!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> Result<&SqlitePool, CacheError> {
        self.pool.as_ref().ok_or(CacheError::NotConnected)
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

pub(crate) fn to_epoch(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp()
}

pub(crate) fn from_epoch(key: &str, seconds: i64) -> Result<DateTime<Utc>, CacheError> {
    DateTime::from_timestamp(seconds, 0).ok_or_else(|| CacheError::CorruptEntry {
        key: key.to_string(),
        reason: format!("timestamp {} out of range", seconds),
    })
}

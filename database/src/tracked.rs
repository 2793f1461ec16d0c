use crate::{to_epoch, Database};
use analytics_core::CacheError;
use chrono::Utc;
use tracing::info;

/// Communities tracked on first start, in display order.
pub const DEFAULT_TRACKED_COMMUNITIES: [&str; 5] = [
    "cscareerquestions",
    "openai",
    "startups",
    "machinelearning",
    "webdev",
];

const SEEDED_SETTING: &str = "tracked_communities_seeded";

impl Database {
    /// Tracked community names ordered by position.
    pub async fn list_tracked(&self) -> Result<Vec<String>, CacheError> {
        self.ensure_tracked_seeded().await?;
        let pool = self.pool()?;
        let names: Vec<String> =
            sqlx::query_scalar("SELECT name FROM tracked_communities ORDER BY position ASC")
                .fetch_all(pool)
                .await?;
        Ok(names)
    }

    /// Append `name` to the tracked list. Returns `false` if it was already tracked.
    pub async fn add_tracked(&self, name: &str) -> Result<bool, CacheError> {
        self.ensure_tracked_seeded().await?;
        let pool = self.pool()?;
        let name = name.to_lowercase();

        let mut tx = pool.begin().await?;
        let exists: Option<String> =
            sqlx::query_scalar("SELECT name FROM tracked_communities WHERE name = ?")
                .bind(&name)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_some() {
            return Ok(false);
        }

        let next_position: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(position), -1) + 1 FROM tracked_communities")
                .fetch_one(&mut *tx)
                .await?;
        sqlx::query("INSERT INTO tracked_communities (name, position, added_at) VALUES (?, ?, ?)")
            .bind(&name)
            .bind(next_position)
            .bind(to_epoch(Utc::now()))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Tracking r/{} at position {}", name, next_position);
        Ok(true)
    }

    /// Returns `false` if `name` was not tracked.
    pub async fn remove_tracked(&self, name: &str) -> Result<bool, CacheError> {
        self.ensure_tracked_seeded().await?;
        let pool = self.pool()?;
        let result = sqlx::query("DELETE FROM tracked_communities WHERE name = ?")
            .bind(name.to_lowercase())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn ensure_tracked_seeded(&self) -> Result<(), CacheError> {
        if self.get_setting(SEEDED_SETTING).await?.is_some() {
            return Ok(());
        }
        let pool = self.pool()?;
        let now = to_epoch(Utc::now());

        let mut tx = pool.begin().await?;
        for (position, name) in DEFAULT_TRACKED_COMMUNITIES.iter().enumerate() {
            sqlx::query(
                "INSERT OR IGNORE INTO tracked_communities (name, position, added_at) VALUES (?, ?, ?)",
            )
            .bind(*name)
            .bind(position as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query(
            "INSERT OR IGNORE INTO settings (key, value, updated_at) VALUES (?, 'true', ?)",
        )
        .bind(SEEDED_SETTING)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            "Seeded tracked communities: {}",
            DEFAULT_TRACKED_COMMUNITIES.join(", ")
        );
        Ok(())
    }
}

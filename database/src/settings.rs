use crate::{to_epoch, Database};
use analytics_core::CacheError;
use chrono::Utc;

impl Database {
    pub async fn save_setting(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let pool = self.pool()?;
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(to_epoch(Utc::now()))
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, CacheError> {
        let pool = self.pool()?;
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
        Ok(value)
    }
}

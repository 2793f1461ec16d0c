use crate::{to_epoch, Database};
use analytics_core::{CacheError, ClassificationCache, ClassificationMap, ClassificationResult};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::debug;

// SQLite caps bound parameters per statement.
const LOOKUP_CHUNK_SIZE: usize = 500;

#[async_trait]
impl ClassificationCache for Database {
    async fn lookup(&self, post_ids: &[String]) -> Result<ClassificationMap, CacheError> {
        let mut found = ClassificationMap::new();
        if post_ids.is_empty() {
            return Ok(found);
        }
        let pool = self.pool()?;

        for chunk in post_ids.chunks(LOOKUP_CHUNK_SIZE) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT post_id, is_solution_request, is_pain_point, is_idea, is_advice_request \
                 FROM classifications WHERE post_id IN (",
            );
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(id);
            }
            separated.push_unseparated(")");

            let rows = builder
                .build()
                .fetch_all(pool)
                .await
                .map_err(|e| CacheError::QueryFailed {
                    query: format!("classification lookup: {}", e),
                })?;

            for row in rows {
                let post_id: String = row.try_get("post_id")?;
                // is_other is derived, so the stored column is never read back.
                let result = ClassificationResult::new(
                    row.try_get("is_solution_request")?,
                    row.try_get("is_pain_point")?,
                    row.try_get("is_idea")?,
                    row.try_get("is_advice_request")?,
                );
                found.insert(post_id, result);
            }
        }

        debug!("Cache hit for {}/{} posts", found.len(), post_ids.len());
        Ok(found)
    }

    async fn store(&self, post_id: &str, result: &ClassificationResult) -> Result<(), CacheError> {
        let pool = self.pool()?;
        sqlx::query(
            r#"
            INSERT INTO classifications
            (post_id, is_solution_request, is_pain_point, is_idea, is_advice_request, is_other, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(post_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(result.is_solution_request())
        .bind(result.is_pain_point())
        .bind(result.is_idea())
        .bind(result.is_advice_request())
        .bind(result.is_other())
        .bind(to_epoch(Utc::now()))
        .execute(pool)
        .await
        .map_err(|e| CacheError::QueryFailed {
            query: format!("classification store for {}: {}", post_id, e),
        })?;
        Ok(())
    }
}

impl Database {
    pub async fn classification_count(&self) -> Result<i64, CacheError> {
        let pool = self.pool()?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM classifications")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }
}

use crate::{from_epoch, to_epoch, Database};
use analytics_core::{CacheError, Subreddit};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Row, Sqlite};
use std::collections::HashMap;

/// A community record together with the time it was last refreshed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSubreddit {
    pub subreddit: Subreddit,
    pub updated_at: DateTime<Utc>,
}

impl Database {
    /// Insert or replace the record keyed by its lowercase name.
    pub async fn upsert_subreddit(
        &self,
        subreddit: &Subreddit,
        updated_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        let pool = self.pool()?;
        sqlx::query(
            r#"
            INSERT INTO subreddits (id, name, member_count, description, url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                id = excluded.id,
                member_count = excluded.member_count,
                description = excluded.description,
                url = excluded.url,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&subreddit.id)
        .bind(subreddit.name.to_lowercase())
        .bind(subreddit.member_count as i64)
        .bind(subreddit.description.as_deref())
        .bind(&subreddit.url)
        .bind(to_epoch(subreddit.created_at))
        .bind(to_epoch(updated_at))
        .execute(pool)
        .await
        .map_err(|e| CacheError::QueryFailed {
            query: format!("subreddit upsert for {}: {}", subreddit.name, e),
        })?;
        Ok(())
    }

    /// Stored records for `names`, in the order the names were given.
    /// Names without a record are skipped.
    pub async fn get_subreddits(&self, names: &[String]) -> Result<Vec<StoredSubreddit>, CacheError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let pool = self.pool()?;

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, name, member_count, description, url, created_at, updated_at \
             FROM subreddits WHERE name IN (",
        );
        let mut separated = builder.separated(", ");
        for name in names {
            separated.push_bind(name.to_lowercase());
        }
        separated.push_unseparated(")");

        let rows = builder
            .build()
            .fetch_all(pool)
            .await
            .map_err(|e| CacheError::QueryFailed {
                query: format!("subreddit lookup: {}", e),
            })?;

        let mut by_name = HashMap::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("name")?;
            let member_count: i64 = row.try_get("member_count")?;
            let stored = StoredSubreddit {
                subreddit: Subreddit {
                    id: row.try_get("id")?,
                    name: name.clone(),
                    member_count: member_count.max(0) as u64,
                    description: row.try_get("description")?,
                    url: row.try_get("url")?,
                    created_at: from_epoch(&name, row.try_get("created_at")?)?,
                },
                updated_at: from_epoch(&name, row.try_get("updated_at")?)?,
            };
            by_name.insert(name, stored);
        }

        Ok(names
            .iter()
            .filter_map(|name| by_name.get(&name.to_lowercase()).cloned())
            .collect())
    }
}

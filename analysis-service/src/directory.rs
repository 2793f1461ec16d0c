use analytics_core::{CoreError, ErrorReporter, Subreddit};
use chrono::{DateTime, Duration, Utc};
use database::{Database, StoredSubreddit};
use futures::future::join_all;
use reddit_client::{normalize_community_name, CommunitySource};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub fn is_stale(updated_at: DateTime<Utc>, now: DateTime<Utc>, max_age: Duration) -> bool {
    now - updated_at >= max_age
}

/// Community records backed by the database and refreshed from Reddit once
/// they are older than `max_age`.
pub struct SubredditDirectory {
    database: Arc<Database>,
    source: Arc<dyn CommunitySource>,
    max_age: Duration,
    reporter: ErrorReporter,
}

impl SubredditDirectory {
    pub fn new(database: Arc<Database>, source: Arc<dyn CommunitySource>, max_age: Duration) -> Self {
        Self {
            database,
            source,
            max_age,
            reporter: ErrorReporter::new(),
        }
    }

    /// Records for `names` in request order.
    ///
    /// A name whose refresh fails is served from its stale record if one
    /// exists, and omitted otherwise. Invalid names are omitted.
    pub async fn load(&self, names: &[String]) -> Result<Vec<Subreddit>, CoreError> {
        let mut wanted = Vec::with_capacity(names.len());
        for name in names {
            match normalize_community_name(name) {
                Ok(normalized) if !wanted.contains(&normalized) => wanted.push(normalized),
                Ok(_) => {}
                Err(e) => self.reporter.report_warning(&e),
            }
        }
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut records: HashMap<String, StoredSubreddit> = self
            .database
            .get_subreddits(&wanted)
            .await?
            .into_iter()
            .map(|stored| (stored.subreddit.name.clone(), stored))
            .collect();

        let to_refresh: Vec<&String> = wanted
            .iter()
            .filter(|name| {
                records
                    .get(name.as_str())
                    .map_or(true, |stored| is_stale(stored.updated_at, now, self.max_age))
            })
            .collect();
        debug!(
            "Directory: {} requested, {} need refresh",
            wanted.len(),
            to_refresh.len()
        );

        let refreshed = join_all(to_refresh.into_iter().map(|name| self.refresh(name, now))).await;
        for (name, fresh) in refreshed {
            if let Some(fresh) = fresh {
                records.insert(name, fresh);
            }
        }

        Ok(wanted
            .iter()
            .filter_map(|name| records.remove(name).map(|stored| stored.subreddit))
            .collect())
    }

    /// Fetch a community, store it and start tracking it.
    pub async fn add(&self, name: &str) -> Result<Subreddit, CoreError> {
        let name = normalize_community_name(name)?;
        let subreddit = self.source.fetch_community(&name).await?;
        self.database.upsert_subreddit(&subreddit, Utc::now()).await?;
        if self.database.add_tracked(&subreddit.name).await? {
            info!("Added r/{} to tracked communities", subreddit.name);
        }
        Ok(subreddit)
    }

    async fn refresh(&self, name: &str, now: DateTime<Utc>) -> (String, Option<StoredSubreddit>) {
        let subreddit = match self.source.fetch_community(name).await {
            Ok(subreddit) => subreddit,
            Err(e) => {
                debug!("Refresh of r/{} failed", name);
                self.reporter.report_warning(&e);
                return (name.to_string(), None);
            }
        };

        if let Err(e) = self.database.upsert_subreddit(&subreddit, now).await {
            self.reporter.report_warning(&e);
        }
        (
            name.to_string(),
            Some(StoredSubreddit {
                subreddit,
                updated_at: now,
            }),
        )
    }
}

pub mod api;
pub mod auth;
mod tests;

pub use api::RedditApiClient;
pub use auth::{RedditCredentials, RedditToken, TokenProvider};

use analytics_core::{
    AppConfig, ConfigError, FetchError, Post, RedditCredentialField, Subreddit,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_POST_LIMIT: u32 = 100;
pub const DEFAULT_RECENCY_WINDOW_HOURS: i64 = 24;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of recent posts for a community.
#[async_trait]
pub trait PostFetcher: Send + Sync {
    async fn fetch_recent_posts(&self, community: &str) -> Result<Vec<Post>, FetchError>;
}

/// Source of community metadata.
#[async_trait]
pub trait CommunitySource: Send + Sync {
    async fn fetch_community(&self, community: &str) -> Result<Subreddit, FetchError>;
}

#[derive(Debug, Clone)]
pub struct RedditClientConfig {
    pub credentials: RedditCredentials,
    pub user_agent: String,
    pub api_base: Url,
    pub token_url: Url,
    pub post_limit: u32,
    pub recency_window: ChronoDuration,
}

impl RedditClientConfig {
    pub fn new(credentials: RedditCredentials, user_agent: String) -> Self {
        let defaults = AppConfig::default();
        Self {
            credentials,
            user_agent,
            api_base: defaults.reddit.api_base,
            token_url: defaults.reddit.token_url,
            post_limit: DEFAULT_POST_LIMIT,
            recency_window: ChronoDuration::hours(DEFAULT_RECENCY_WINDOW_HOURS),
        }
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let reddit = &config.reddit;
        let credentials = RedditCredentials {
            client_id: reddit.require(RedditCredentialField::ClientId)?,
            client_secret: reddit.require(RedditCredentialField::ClientSecret)?,
            username: reddit.require(RedditCredentialField::Username)?,
            password: reddit.require(RedditCredentialField::Password)?,
        };

        Ok(Self {
            credentials,
            user_agent: reddit.user_agent.clone(),
            api_base: reddit.api_base.clone(),
            token_url: reddit.token_url.clone(),
            post_limit: config.pipeline.post_limit,
            recency_window: ChronoDuration::hours(config.pipeline.recency_window_hours),
        })
    }
}

/// Reddit client for fetching recent posts and community metadata.
#[derive(Debug)]
pub struct RedditClient {
    api: RedditApiClient,
    tokens: TokenProvider,
    post_limit: u32,
    recency_window: ChronoDuration,
}

impl RedditClient {
    pub fn new(config: RedditClientConfig) -> Result<Self, FetchError> {
        let api = RedditApiClient::new(config.user_agent, config.api_base, REQUEST_TIMEOUT)?;
        let tokens = TokenProvider::new(
            config.credentials,
            &config.token_url,
            api.http_client().clone(),
        )?;

        Ok(Self {
            api,
            tokens,
            post_limit: config.post_limit,
            recency_window: config.recency_window,
        })
    }

    pub fn api(&self) -> &RedditApiClient {
        &self.api
    }

    pub fn tokens(&self) -> &TokenProvider {
        &self.tokens
    }

    async fn access_token(&self) -> Result<String, FetchError> {
        self.tokens.access_token().await
    }

    /// A rejected token is discarded so the next call re-authenticates. The
    /// failing call itself is not retried.
    async fn forget_rejected_token<T>(&self, result: Result<T, FetchError>) -> Result<T, FetchError> {
        if matches!(result, Err(FetchError::InvalidToken)) {
            self.tokens.invalidate().await;
        }
        result
    }
}

#[async_trait]
impl PostFetcher for RedditClient {
    async fn fetch_recent_posts(&self, community: &str) -> Result<Vec<Post>, FetchError> {
        let community = normalize_community_name(community)?;
        let token = self.access_token().await?;

        let listing = self
            .forget_rejected_token(
                self.api
                    .get_new_posts(&token, &community, self.post_limit)
                    .await,
            )
            .await?;

        let posts = listing
            .data
            .children
            .into_iter()
            .map(|child| Post::try_from(child.data))
            .collect::<Result<Vec<_>, _>>()?;

        let fetched = posts.len();
        let recent = filter_recent(posts, Utc::now(), self.recency_window);
        debug!(
            "r/{}: {} of {} posts fall inside the recency window",
            community,
            recent.len(),
            fetched
        );
        Ok(recent)
    }
}

#[async_trait]
impl CommunitySource for RedditClient {
    async fn fetch_community(&self, community: &str) -> Result<Subreddit, FetchError> {
        let community = normalize_community_name(community)?;
        let token = self.access_token().await?;

        let about = self
            .forget_rejected_token(self.api.get_subreddit_info(&token, &community).await)
            .await?;

        let subreddit = Subreddit::try_from(about)?;
        info!(
            "Fetched r/{} ({} members)",
            subreddit.name, subreddit.member_count
        );
        Ok(subreddit)
    }
}

/// Keep only posts created strictly after `now - window`, preserving order.
pub fn filter_recent(posts: Vec<Post>, now: DateTime<Utc>, window: ChronoDuration) -> Vec<Post> {
    let cutoff = now - window;
    posts
        .into_iter()
        .filter(|post| post.created_at > cutoff)
        .collect()
}

/// Validate a community name, stripping an `r/` prefix and lowercasing it.
pub fn normalize_community_name(name: &str) -> Result<String, FetchError> {
    let trimmed = name.trim();
    let bare = trimmed
        .strip_prefix("/r/")
        .or_else(|| trimmed.strip_prefix("r/"))
        .unwrap_or(trimmed);

    let valid_length = (2..=21).contains(&bare.len());
    let valid_chars = bare
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_length && valid_chars {
        Ok(bare.to_lowercase())
    } else {
        Err(FetchError::InvalidCommunity {
            name: name.to_string(),
        })
    }
}

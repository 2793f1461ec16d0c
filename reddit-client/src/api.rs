use analytics_core::{FetchError, Post, Subreddit};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

const SUBREDDIT_KIND: &str = "t5";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    pub url: String,
    pub created_utc: f64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditSubredditData {
    /// Fullname, e.g. `t5_2qh33`.
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub subscribers: Option<u64>,
    #[serde(default)]
    pub public_description: String,
    #[serde(default)]
    pub description: String,
    pub created_utc: f64,
}

#[derive(Debug, Clone)]
pub struct RedditApiClient {
    http_client: Client,
    api_base: Url,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String, api_base: Url, timeout: Duration) -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network {
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            api_base: with_trailing_slash(api_base),
            user_agent,
        })
    }

    /// Shared HTTP client, also used for the token endpoint.
    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<Response, FetchError> {
        let url = self
            .api_base
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| FetchError::InvalidResponse {
                details: format!("invalid endpoint {}: {}", endpoint, e),
            })?;

        let mut request_builder = self
            .http_client
            .request(method.clone(), url)
            .bearer_auth(access_token);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }

        info!("Making Reddit API request: {} {}", method, endpoint);
        let response = request_builder.send().await.map_err(|e| {
            error!("Network error for {} {}: {}", method, endpoint, e);
            if e.is_timeout() {
                FetchError::RequestTimeout
            } else {
                FetchError::Network {
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if status.is_success() {
            debug!("Request successful: {} {}", status, endpoint);
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse::<u64>().ok())
                    .unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                FetchError::RateLimitExceeded { retry_after }
            }
            StatusCode::UNAUTHORIZED => FetchError::InvalidToken,
            StatusCode::FORBIDDEN => FetchError::Forbidden {
                resource: endpoint.to_string(),
            },
            StatusCode::NOT_FOUND => FetchError::CommunityNotFound {
                community: community_from_endpoint(endpoint),
            },
            status if status.is_server_error() => FetchError::ServerError {
                status_code: status.as_u16(),
            },
            status => FetchError::InvalidResponse {
                details: format!("unexpected status {} for {}", status, endpoint),
            },
        })
    }

    /// Newest posts of a community, one page of at most `limit` entries.
    pub async fn get_new_posts(
        &self,
        access_token: &str,
        subreddit: &str,
        limit: u32,
    ) -> Result<RedditListing<RedditPostData>, FetchError> {
        let endpoint = format!("r/{}/new", subreddit);
        let limit_str = limit.to_string();
        let params = [("limit", limit_str.as_str()), ("raw_json", "1")];

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&params))
            .await?;

        let listing: RedditListing<RedditPostData> =
            parse_json(response, &format!("posts for r/{}", subreddit)).await?;

        info!(
            "Retrieved {} posts from r/{}",
            listing.data.children.len(),
            subreddit
        );
        Ok(listing)
    }

    pub async fn get_subreddit_info(
        &self,
        access_token: &str,
        subreddit: &str,
    ) -> Result<RedditSubredditData, FetchError> {
        let endpoint = format!("r/{}/about", subreddit);

        let response = self
            .make_request(Method::GET, &endpoint, access_token, Some(&[("raw_json", "1")]))
            .await?;

        let value: serde_json::Value =
            parse_json(response, &format!("info for r/{}", subreddit)).await?;

        // Unknown communities come back as an empty search listing instead of a 404.
        if value.get("kind").and_then(|kind| kind.as_str()) != Some(SUBREDDIT_KIND) {
            return Err(FetchError::CommunityNotFound {
                community: subreddit.to_string(),
            });
        }

        let about: RedditListingChild<RedditSubredditData> = serde_json::from_value(value)
            .map_err(|e| {
                error!("Failed to parse subreddit info: {}", e);
                FetchError::InvalidResponse {
                    details: format!("Failed to parse info for r/{}", subreddit),
                }
            })?;

        debug!("Retrieved info for r/{}", subreddit);
        Ok(about.data)
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, FetchError> {
    response.json::<T>().await.map_err(|e| {
        error!("Failed to parse {}: {}", what, e);
        FetchError::InvalidResponse {
            details: format!("Failed to parse {}", what),
        }
    })
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn community_from_endpoint(endpoint: &str) -> String {
    endpoint
        .trim_start_matches('/')
        .strip_prefix("r/")
        .and_then(|rest| rest.split('/').next())
        .unwrap_or(endpoint)
        .to_string()
}

fn timestamp_from_utc(created_utc: f64) -> Result<DateTime<Utc>, FetchError> {
    Utc.timestamp_opt(created_utc.trunc() as i64, 0)
        .single()
        .ok_or_else(|| FetchError::InvalidResponse {
            details: format!("invalid created_utc {}", created_utc),
        })
}

impl TryFrom<RedditPostData> for Post {
    type Error = FetchError;

    fn try_from(post_data: RedditPostData) -> Result<Self, Self::Error> {
        Ok(Self {
            created_at: timestamp_from_utc(post_data.created_utc)?,
            id: post_data.id,
            title: post_data.title,
            content: post_data.selftext,
            score: post_data.score,
            num_comments: post_data.num_comments,
            url: post_data.url,
        })
    }
}

impl TryFrom<RedditSubredditData> for Subreddit {
    type Error = FetchError;

    fn try_from(data: RedditSubredditData) -> Result<Self, Self::Error> {
        let description = [data.public_description, data.description]
            .into_iter()
            .map(|text| text.trim().to_string())
            .find(|text| !text.is_empty());

        Ok(Self {
            created_at: timestamp_from_utc(data.created_utc)?,
            id: data.name,
            name: data.display_name.to_lowercase(),
            member_count: data.subscribers.unwrap_or_default(),
            description,
            url: format!("https://reddit.com/r/{}", data.display_name),
        })
    }
}

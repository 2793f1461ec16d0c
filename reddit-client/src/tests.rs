#[cfg(test)]
mod tests {
    use crate::{
        filter_recent, normalize_community_name, CommunitySource, PostFetcher, RedditClient,
        RedditClientConfig, RedditCredentials,
    };
    use analytics_core::{FetchError, Post};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER_AGENT: &str = "reddit-analytics-tests/1.0";

    fn create_test_credentials() -> RedditCredentials {
        RedditCredentials {
            client_id: "test_client_id".to_string(),
            client_secret: "test_client_secret".to_string(),
            username: "test_user".to_string(),
            password: "test_password".to_string(),
        }
    }

    fn create_test_config(server: &MockServer) -> RedditClientConfig {
        let mut config = RedditClientConfig::new(create_test_credentials(), USER_AGENT.to_string());
        config.api_base = Url::parse(&server.uri()).unwrap();
        config.token_url = Url::parse(&format!("{}/api/v1/access_token", server.uri())).unwrap();
        config
    }

    fn post_at(id: &str, hours_ago: i64) -> Post {
        Post {
            id: id.to_string(),
            title: format!("Post {}", id),
            content: String::new(),
            score: 1,
            num_comments: 0,
            created_at: Utc::now() - Duration::hours(hours_ago),
            url: format!("https://reddit.com/{}", id),
        }
    }

    fn listing_child(id: &str, created_utc: i64) -> serde_json::Value {
        json!({
            "kind": "t3",
            "data": {
                "id": id,
                "title": format!("Title {}", id),
                "selftext": "",
                "subreddit": "rust",
                "url": format!("https://reddit.com/r/rust/comments/{}", id),
                "permalink": format!("/r/rust/comments/{}", id),
                "created_utc": created_utc as f64,
                "score": 10,
                "num_comments": 3
            }
        })
    }

    async fn mount_token_endpoint(server: &MockServer, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("username=test_user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "test_access_token",
                "token_type": "bearer",
                "expires_in": 86400,
                "scope": "read"
            })))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn test_recency_filter_boundaries() {
        let now = Utc::now();
        let posts = vec![post_at("fresh", 1), post_at("day_old", 23), post_at("stale", 25)];

        let recent = filter_recent(posts, now, Duration::hours(24));
        let ids: Vec<_> = recent.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["fresh", "day_old"]);
    }

    #[test]
    fn test_recency_filter_is_strict() {
        let now = Utc::now();
        let mut exactly_at_cutoff = post_at("edge", 0);
        exactly_at_cutoff.created_at = now - Duration::hours(24);

        assert!(filter_recent(vec![exactly_at_cutoff], now, Duration::hours(24)).is_empty());
    }

    #[test]
    fn test_community_name_normalization() {
        assert_eq!(normalize_community_name("rust").unwrap(), "rust");
        assert_eq!(normalize_community_name("r/MachineLearning").unwrap(), "machinelearning");
        assert_eq!(normalize_community_name(" /r/web_dev ").unwrap(), "web_dev");

        for bad in ["", "a", "has space", "semi;colon", "r/", "abcdefghijklmnopqrstuv"] {
            assert!(
                matches!(
                    normalize_community_name(bad),
                    Err(FetchError::InvalidCommunity { .. })
                ),
                "expected {:?} to be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn test_fetch_recent_posts_filters_and_maps() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 1).await;

        let now = Utc::now().timestamp();
        Mock::given(method("GET"))
            .and(path("/r/rust/new"))
            .and(query_param("limit", "100"))
            .and(header("authorization", "Bearer test_access_token"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "Listing",
                "data": {
                    "after": null,
                    "before": null,
                    "dist": 3,
                    "children": [
                        listing_child("new1", now - 3600),
                        listing_child("new2", now - 23 * 3600),
                        listing_child("old1", now - 25 * 3600)
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = RedditClient::new(create_test_config(&server)).unwrap();
        let posts = client.fetch_recent_posts("r/Rust").await.unwrap();

        let ids: Vec<_> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new1", "new2"]);
        assert_eq!(posts[0].title, "Title new1");
        assert_eq!(posts[0].num_comments, 3);
        assert_eq!(posts[0].content, "");
    }

    #[tokio::test]
    async fn test_token_is_reused_between_calls() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/r/rust/new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "Listing",
                "data": { "after": null, "before": null, "dist": 0, "children": [] }
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = RedditClient::new(create_test_config(&server)).unwrap();
        assert!(client.fetch_recent_posts("rust").await.unwrap().is_empty());
        assert!(client.fetch_recent_posts("rust").await.unwrap().is_empty());

        let token = client.tokens().cached_token().await.unwrap();
        assert_eq!(token.access_token, "test_access_token");
        assert!(!token.is_expired());
        assert_eq!(token.scope, vec!["read".to_string()]);
    }

    #[tokio::test]
    async fn test_unauthorized_discards_token() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/r/rust/new"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = RedditClient::new(create_test_config(&server)).unwrap();
        let result = client.fetch_recent_posts("rust").await;

        assert_eq!(result.unwrap_err(), FetchError::InvalidToken);
        assert!(client.tokens().cached_token().await.is_none());
    }

    #[tokio::test]
    async fn test_upstream_status_mapping() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/r/missing/new"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/busy/new"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/broken/new"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/garbled/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = RedditClient::new(create_test_config(&server)).unwrap();

        assert_eq!(
            client.fetch_recent_posts("missing").await.unwrap_err(),
            FetchError::CommunityNotFound {
                community: "missing".to_string()
            }
        );
        assert_eq!(
            client.fetch_recent_posts("busy").await.unwrap_err(),
            FetchError::RateLimitExceeded { retry_after: 12 }
        );
        assert_eq!(
            client.fetch_recent_posts("broken").await.unwrap_err(),
            FetchError::ServerError { status_code: 503 }
        );
        assert!(matches!(
            client.fetch_recent_posts("garbled").await.unwrap_err(),
            FetchError::InvalidResponse { .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_name_skips_network() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 0).await;

        let client = RedditClient::new(create_test_config(&server)).unwrap();
        let result = client.fetch_recent_posts("not a community").await;
        assert!(matches!(result, Err(FetchError::InvalidCommunity { .. })));
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "invalid_grant"
            })))
            .mount(&server)
            .await;

        let client = RedditClient::new(create_test_config(&server)).unwrap();
        let result = client.fetch_recent_posts("rust").await;
        assert!(matches!(
            result,
            Err(FetchError::AuthenticationFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_community() {
        let server = MockServer::start().await;
        mount_token_endpoint(&server, 1).await;

        Mock::given(method("GET"))
            .and(path("/r/webdev/about"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "t5",
                "data": {
                    "name": "t5_2qs0q",
                    "display_name": "webdev",
                    "subscribers": 2500000,
                    "public_description": "A community for web developers",
                    "description": "Sidebar",
                    "created_utc": 1232168542.0
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/nosuchplace/about"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "Listing",
                "data": { "after": null, "before": null, "dist": 0, "children": [] }
            })))
            .mount(&server)
            .await;

        let client = RedditClient::new(create_test_config(&server)).unwrap();

        let subreddit = client.fetch_community("WebDev").await.unwrap();
        assert_eq!(subreddit.id, "t5_2qs0q");
        assert_eq!(subreddit.name, "webdev");
        assert_eq!(subreddit.member_count, 2_500_000);
        assert_eq!(
            subreddit.description.as_deref(),
            Some("A community for web developers")
        );
        assert_eq!(subreddit.url, "https://reddit.com/r/webdev");

        assert!(matches!(
            client.fetch_community("nosuchplace").await,
            Err(FetchError::CommunityNotFound { .. })
        ));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let rendered = format!("{:?}", create_test_credentials());
        assert!(rendered.contains("test_client_id"));
        assert!(!rendered.contains("test_password"));
        assert!(!rendered.contains("test_client_secret"));
    }
}

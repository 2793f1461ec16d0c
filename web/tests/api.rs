use analysis_service::{AnalysisService, BatchClassifier, SubredditDirectory};
use analytics_core::{
    ClassificationError, ClassificationResult, FetchError, Post, Subreddit,
};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use database::{Database, InMemoryCache};
use llm_interface::Categorizer;
use reddit_client::{CommunitySource, PostFetcher};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use web::{create_app, AppState};

struct StubReddit;

#[async_trait]
impl PostFetcher for StubReddit {
    async fn fetch_recent_posts(&self, community: &str) -> Result<Vec<Post>, FetchError> {
        let community = reddit_client::normalize_community_name(community)?;
        if community == "broken" {
            return Err(FetchError::ServerError { status_code: 502 });
        }
        Ok(vec![Post {
            id: format!("{}_1", community),
            title: "Looking for a tool to track invoices".to_string(),
            content: String::new(),
            score: 12,
            num_comments: 4,
            created_at: Utc::now() - Duration::hours(2),
            url: format!("https://reddit.com/r/{}/comments/1", community),
        }])
    }
}

#[async_trait]
impl CommunitySource for StubReddit {
    async fn fetch_community(&self, community: &str) -> Result<Subreddit, FetchError> {
        if community == "ghost" {
            return Err(FetchError::CommunityNotFound {
                community: community.to_string(),
            });
        }
        Ok(Subreddit {
            id: format!("t5_{}", community),
            name: community.to_string(),
            member_count: 1000,
            description: Some("A community".to_string()),
            url: format!("https://reddit.com/r/{}", community),
            created_at: Utc::now() - Duration::days(365),
        })
    }
}

struct StubCategorizer;

#[async_trait]
impl Categorizer for StubCategorizer {
    async fn classify(
        &self,
        title: &str,
        _content: &str,
    ) -> Result<ClassificationResult, ClassificationError> {
        if title.contains("fail") {
            return Err(ClassificationError::ServiceUnavailable {
                provider: "stub".to_string(),
            });
        }
        Ok(ClassificationResult::new(true, false, false, false))
    }
}

async fn test_app() -> Router {
    let db_path = std::env::temp_dir().join(format!("test_web_{}.db", uuid::Uuid::new_v4()));
    let mut db = Database::new(format!("sqlite://{}", db_path.display()));
    db.connect().await.expect("Failed to connect to test database");
    db.run_migrations().await.expect("Failed to run migrations");
    let database = Arc::new(db);

    let reddit = Arc::new(StubReddit);
    let classifier = BatchClassifier::new(Arc::new(StubCategorizer), Arc::new(InMemoryCache::new()));
    let service = Arc::new(AnalysisService::new(reddit.clone(), Arc::new(classifier)));
    let directory = Arc::new(SubredditDirectory::new(
        database.clone(),
        reddit,
        Duration::hours(24),
    ));

    create_app(AppState {
        service,
        directory,
        database,
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_posts_requires_subreddit() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/posts", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Subreddit is required" }));

    let (status, body) = send(&app, Method::GET, "/api/posts?subreddit=rust", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], "rust_1");
    assert_eq!(body[0]["numComments"], 4);
}

#[tokio::test]
async fn test_posts_upstream_failure() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/api/posts?subreddit=broken", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to fetch posts" }));

    let (status, _) = send(&app, Method::GET, "/api/posts?subreddit=bad%20name", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_endpoint() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/analyze",
        Some(json!({ "title": "Any tool for invoices?", "content": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isSolutionRequest"], true);
    assert_eq!(body["isOther"], false);

    let (status, body) = send(&app, Method::POST, "/api/analyze", Some(json!({ "content": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Title is required" }));

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/analyze",
        Some(json!({ "title": "this will fail" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to analyze post" }));
}

#[tokio::test]
async fn test_subreddit_tracking_flow() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/api/tracked", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!(["cscareerquestions", "openai", "startups", "machinelearning", "webdev"])
    );

    let (status, body) = send(&app, Method::POST, "/api/subreddits", Some(json!({ "name": "r/rust" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "rust");
    assert_eq!(body["memberCount"], 1000);

    let (_, body) = send(&app, Method::GET, "/api/tracked", None).await;
    assert_eq!(body.as_array().unwrap().last().unwrap(), "rust");

    let (status, body) = send(&app, Method::POST, "/api/subreddits", Some(json!({ "name": "ghost" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to add subreddit" }));

    let (status, _) = send(&app, Method::DELETE, "/api/tracked/openai", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, "/api/tracked/openai", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/api/tracked/r%2FWebDev", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, Method::GET, "/api/tracked", None).await;
    assert_eq!(body, json!(["cscareerquestions", "startups", "machinelearning", "rust"]));

    let (status, _) = send(&app, Method::DELETE, "/api/tracked/bad%20name", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_default_subreddits() {
    let app = test_app().await;

    let (status, _) = send(&app, Method::GET, "/api/subreddits/defaults", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/subreddits/defaults?subreddits=webdev,ghost,startups",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["webdev", "startups"]);
}

#[tokio::test]
async fn test_analysis_and_progress() {
    let app = test_app().await;

    let (status, _) = send(&app, Method::GET, "/api/communities/rust/progress", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, "/api/communities/rust/analysis", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["community"], "rust");
    assert_eq!(body["themes"].as_array().unwrap().len(), 5);
    assert_eq!(body["themes"][0]["name"], "Solution Request");
    assert_eq!(body["themes"][0]["posts"][0]["id"], "rust_1");
    assert_eq!(body["classifications"]["rust_1"]["isSolutionRequest"], true);

    let (status, body) = send(&app, Method::GET, "/api/communities/rust/progress", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "community": "rust", "progress": 100.0 }));

    let (status, body) = send(&app, Method::GET, "/api/communities/r%2FRust/progress", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "community": "rust", "progress": 100.0 }));

    let (status, _) = send(&app, Method::GET, "/api/communities/broken/analysis", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

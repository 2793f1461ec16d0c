use crate::{ApiError, AppState};
use analysis_service::AnalysisSnapshot;
use analytics_core::{ClassificationResult, CoreError, Post, Subreddit};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use reddit_client::normalize_community_name;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    pub subreddit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddSubredditRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DefaultsQuery {
    pub subreddits: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub community: String,
    pub progress: f64,
}

fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

fn community_name(raw: &str) -> Result<String, ApiError> {
    normalize_community_name(raw)
        .map_err(|e| ApiError::upstream("Invalid subreddit name", CoreError::from(e)))
}

pub async fn get_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let subreddit = required(query.subreddit, "Subreddit is required")?;
    let posts = state
        .service
        .fetch_posts(&subreddit)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch posts", e))?;
    Ok(Json(posts))
}

pub async fn analyze_post(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let title = required(request.title, "Title is required")?;
    let content = request.content.unwrap_or_default();
    let result = state
        .service
        .classify_text(&title, &content)
        .await
        .map_err(|e| ApiError::upstream("Failed to analyze post", e))?;
    Ok(Json(result))
}

pub async fn add_subreddit(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AddSubredditRequest>,
) -> Result<Json<Subreddit>, ApiError> {
    let name = required(request.name, "Subreddit name is required")?;
    let subreddit = state
        .directory
        .add(&name)
        .await
        .map_err(|e| ApiError::upstream("Failed to add subreddit", e))?;
    Ok(Json(subreddit))
}

pub async fn get_default_subreddits(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DefaultsQuery>,
) -> Result<Json<Vec<Subreddit>>, ApiError> {
    let raw = required(query.subreddits, "Subreddits parameter is required")?;
    let names: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    let subreddits = state
        .directory
        .load(&names)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch subreddits", e))?;
    Ok(Json(subreddits))
}

pub async fn list_tracked(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    let names = state
        .database
        .list_tracked()
        .await
        .map_err(|e| ApiError::upstream("Failed to load tracked subreddits", CoreError::from(e)))?;
    Ok(Json(names))
}

pub async fn remove_tracked(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let name = community_name(&name)?;
    let removed = state
        .database
        .remove_tracked(&name)
        .await
        .map_err(|e| ApiError::upstream("Failed to remove subreddit", CoreError::from(e)))?;
    if !removed {
        return Err(ApiError::NotFound(format!("r/{} is not tracked", name)));
    }
    info!("Stopped tracking r/{}", name);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<AnalysisSnapshot>, ApiError> {
    let snapshot = state
        .service
        .snapshot_or_analyze(&name)
        .await
        .map_err(|e| ApiError::upstream("Failed to analyze subreddit", e))?;
    Ok(Json(snapshot))
}

pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let name = community_name(&name)?;
    let progress = state
        .service
        .progress(&name)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("No analysis for r/{}", name)))?;
    Ok(Json(ProgressResponse {
        community: name,
        progress,
    }))
}

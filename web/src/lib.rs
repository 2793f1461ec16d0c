use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/posts", get(handlers::get_posts))
        .route("/api/analyze", post(handlers::analyze_post))
        .route("/api/subreddits", post(handlers::add_subreddit))
        .route("/api/subreddits/defaults", get(handlers::get_default_subreddits))
        .route("/api/tracked", get(handlers::list_tracked))
        .route("/api/tracked/:name", delete(handlers::remove_tracked))
        .route("/api/communities/:name/analysis", get(handlers::get_analysis))
        .route("/api/communities/:name/progress", get(handlers::get_progress))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

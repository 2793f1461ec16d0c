use analytics_core::{CoreError, ErrorExt, FetchError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// An upstream failure, reported to the client with a fixed message.
    #[error("{message}")]
    Upstream {
        message: &'static str,
        #[source]
        source: CoreError,
    },
}

impl ApiError {
    pub fn upstream(message: &'static str, source: CoreError) -> Self {
        match source {
            CoreError::Fetch(FetchError::InvalidCommunity { name }) => {
                ApiError::BadRequest(format!("Invalid subreddit name: {}", name))
            }
            CoreError::InvalidInput { message } => ApiError::BadRequest(message),
            source => {
                source.log_error();
                ApiError::Upstream { message, source }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

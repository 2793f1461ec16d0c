use crate::error::*;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::Fetch(e) => {
                error!("Fetch error details: {:?}", e);
            }
            CoreError::Classification(e) => {
                error!("Classification error details: {:?}", e);
            }
            CoreError::Cache(e) => {
                error!("Cache error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::Fetch(e) => e.user_friendly_message(),
            CoreError::Classification(e) => e.user_friendly_message(),
            CoreError::Cache(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            CoreError::NotFound { resource } => format!("Could not find: {}", resource),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Fetch(_) => "FETCH".to_string(),
            CoreError::Classification(_) => "CLASSIFICATION".to_string(),
            CoreError::Cache(_) => "CACHE".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::NotFound { .. } => "NOT_FOUND".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for FetchError {
    fn log_error(&self) -> &Self {
        error!("FetchError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("FetchError (warning): {}", self);
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            FetchError::AuthenticationFailed { .. } => {
                "Reddit authentication failed. Please check your credentials.".to_string()
            }
            FetchError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            FetchError::Forbidden { resource } => format!(
                "Access denied to {}. The community may be private or quarantined.",
                resource
            ),
            FetchError::CommunityNotFound { community } => {
                format!("Subreddit '{}' not found or is private.", community)
            }
            FetchError::InvalidCommunity { name } => {
                format!("'{}' is not a valid subreddit name.", name)
            }
            FetchError::InvalidToken => {
                "Reddit authentication token is invalid. Please try again.".to_string()
            }
            FetchError::RequestTimeout => {
                "Request to Reddit timed out. Please try again.".to_string()
            }
            _ => "Failed to fetch posts from Reddit. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            FetchError::AuthenticationFailed { .. } => "FETCH_AUTH_FAILED".to_string(),
            FetchError::RateLimitExceeded { .. } => "FETCH_RATE_LIMIT".to_string(),
            FetchError::Forbidden { .. } => "FETCH_FORBIDDEN".to_string(),
            FetchError::CommunityNotFound { .. } => "FETCH_COMMUNITY_NOT_FOUND".to_string(),
            FetchError::InvalidCommunity { .. } => "FETCH_INVALID_COMMUNITY".to_string(),
            FetchError::InvalidToken => "FETCH_INVALID_TOKEN".to_string(),
            FetchError::RequestTimeout => "FETCH_TIMEOUT".to_string(),
            FetchError::InvalidResponse { .. } => "FETCH_INVALID_RESPONSE".to_string(),
            FetchError::ServerError { .. } => "FETCH_SERVER_ERROR".to_string(),
            FetchError::Network { .. } => "FETCH_NETWORK".to_string(),
        }
    }
}

impl ErrorExt for ClassificationError {
    fn log_error(&self) -> &Self {
        error!("ClassificationError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ClassificationError (warning): {}", self);
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ClassificationError::EmptyTitle => "Post title is required".to_string(),
            ClassificationError::InvalidApiKey { provider } => format!(
                "Invalid API key for {}. Please update your credentials.",
                provider
            ),
            ClassificationError::RateLimitExceeded {
                provider,
                retry_after,
            } => format!(
                "Rate limit exceeded for {}. Please wait {} seconds.",
                provider, retry_after
            ),
            ClassificationError::ServiceUnavailable { provider } => format!(
                "{} service is temporarily unavailable. Please try again later.",
                provider
            ),
            _ => "Failed to analyze post".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ClassificationError::EmptyTitle => "LLM_EMPTY_TITLE".to_string(),
            ClassificationError::InvalidApiKey { .. } => "LLM_INVALID_API_KEY".to_string(),
            ClassificationError::RateLimitExceeded { .. } => "LLM_RATE_LIMIT".to_string(),
            ClassificationError::ServiceUnavailable { .. } => {
                "LLM_SERVICE_UNAVAILABLE".to_string()
            }
            ClassificationError::RequestTimeout { .. } => "LLM_TIMEOUT".to_string(),
            ClassificationError::RequestFailed { .. } => "LLM_REQUEST_FAILED".to_string(),
            ClassificationError::Refused { .. } => "LLM_REFUSED".to_string(),
            ClassificationError::InvalidResponseFormat { .. } => {
                "LLM_INVALID_RESPONSE".to_string()
            }
            ClassificationError::Network { .. } => "LLM_NETWORK".to_string(),
        }
    }
}

impl ErrorExt for CacheError {
    fn log_error(&self) -> &Self {
        error!("CacheError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CacheError (warning): {}", self);
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CacheError::NotConnected | CacheError::ConnectionFailed { .. } => {
                "Database connection failed. Please try again.".to_string()
            }
            CacheError::MigrationFailed { .. } => {
                "Database could not be prepared. Please check the database file.".to_string()
            }
            _ => "Database error occurred. Please try again.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CacheError::NotConnected => "CACHE_NOT_CONNECTED".to_string(),
            CacheError::ConnectionFailed { .. } => "CACHE_CONNECTION_FAILED".to_string(),
            CacheError::MigrationFailed { .. } => "CACHE_MIGRATION_FAILED".to_string(),
            CacheError::QueryFailed { .. } => "CACHE_QUERY_FAILED".to_string(),
            CacheError::CorruptEntry { .. } => "CACHE_CORRUPT_ENTRY".to_string(),
            CacheError::Unavailable { .. } => "CACHE_UNAVAILABLE".to_string(),
            CacheError::Sql(_) => "CACHE_SQL_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' not found.", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "Environment variable '{}' is required but not set.",
                var_name
            ),
            ConfigError::PermissionDenied { .. } => {
                "Permission denied accessing configuration. Please check file permissions."
                    .to_string()
            }
            _ => "Configuration error occurred. Please check your settings.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::PermissionDenied { .. } => "CONFIG_PERMISSION_DENIED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

/// Logs errors uniformly: a line for the error, its code and the user-facing text.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error<E: ErrorExt>(&self, error: &E) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
            info!("User message: {}", error.user_friendly_message());
        }
    }

    pub fn report_warning<E: ErrorExt>(&self, error: &E) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}

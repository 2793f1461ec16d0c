use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Classification error: {0}")]
    Classification(#[from] ClassificationError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Failures talking to the upstream content API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Rate limit exceeded. Retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    #[error("Forbidden access to resource: {resource}")]
    Forbidden { resource: String },

    #[error("Community not found: {community}")]
    CommunityNotFound { community: String },

    #[error("Invalid community name: {name}")]
    InvalidCommunity { name: String },

    #[error("Invalid OAuth token")]
    InvalidToken,

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("Server error: {status_code}")]
    ServerError { status_code: u16 },

    #[error("Network failure: {reason}")]
    Network { reason: String },
}

/// Failures of a single categorizer call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("Post title is required")]
    EmptyTitle,

    #[error("API key invalid or missing for {provider}")]
    InvalidApiKey { provider: String },

    #[error("Rate limit exceeded for {provider}. Retry after {retry_after} seconds")]
    RateLimitExceeded { provider: String, retry_after: u64 },

    #[error("Provider service unavailable: {provider}")]
    ServiceUnavailable { provider: String },

    #[error("Request timeout for {provider}")]
    RequestTimeout { provider: String },

    #[error("Request to {provider} failed with status {status_code}")]
    RequestFailed { provider: String, status_code: u16 },

    #[error("Model refused to categorize: {reason}")]
    Refused { reason: String },

    #[error("Invalid response format from {provider}: {details}")]
    InvalidResponseFormat { provider: String, details: String },

    #[error("Network failure reaching {provider}: {reason}")]
    Network { provider: String, reason: String },
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Database not connected")]
    NotConnected,

    #[error("Connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Migration failed: {migration}")]
    MigrationFailed { migration: String },

    #[error("Query execution failed: {query}")]
    QueryFailed { query: String },

    #[error("Corrupt cache entry for {key}: {reason}")]
    CorruptEntry { key: String, reason: String },

    #[error("Cache unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Environment variable not set: {var_name}")]
    MissingEnvironmentVariable { var_name: String },

    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Permission denied accessing config: {path}")]
    PermissionDenied { path: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}

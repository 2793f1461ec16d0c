//! Application configuration.
//!
//! Values come from an optional TOML file, then environment variables override
//! individual fields. Secrets are never printed by the `Debug` impls.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "reddit-analytics.toml";
pub const CONFIG_PATH_ENV: &str = "REDDIT_ANALYTICS_CONFIG";

pub const DEFAULT_REDDIT_API_BASE: &str = "https://oauth.reddit.com/";
pub const DEFAULT_REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1/";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_agent: String,
    pub api_base: Url,
    pub token_url: Url,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            user_agent: format!("reddit-analytics/{}", env!("CARGO_PKG_VERSION")),
            api_base: parse_default_url(DEFAULT_REDDIT_API_BASE),
            token_url: parse_default_url(DEFAULT_REDDIT_TOKEN_URL),
        }
    }
}

impl fmt::Debug for RedditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .field("api_base", &self.api_base.as_str())
            .field("token_url", &self.token_url.as_str())
            .finish()
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub api_base: Url,
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: 0.1,
            api_base: parse_default_url(DEFAULT_OPENAI_API_BASE),
            request_timeout_secs: 60,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("api_base", &self.api_base.as_str())
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Posts classified concurrently before the next batch starts.
    pub batch_size: usize,
    /// Page size requested from the listing endpoint.
    pub post_limit: u32,
    pub recency_window_hours: i64,
    /// Age after which a stored subreddit record is refreshed.
    pub subreddit_cache_hours: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            post_limit: 100,
            recency_window_hours: 24,
            subreddit_cache_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reddit: RedditConfig,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub database_url: String,
    pub bind_address: String,
    pub polling_interval_minutes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reddit: RedditConfig::default(),
            llm: LlmConfig::default(),
            pipeline: PipelineConfig::default(),
            database_url: "sqlite://reddit-analytics.db".to_string(),
            bind_address: "127.0.0.1:3000".to_string(),
            polling_interval_minutes: 60,
        }
    }
}

impl AppConfig {
    /// Load the config file (if any), apply environment overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit_path = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let path = explicit_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            tracing::info!("Loading configuration from {}", path.display());
            Self::from_file(&path)?
        } else if explicit_path.is_some() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        } else {
            tracing::debug!("No configuration file found, using defaults");
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound {
                path: path.display().to_string(),
            },
            std::io::ErrorKind::PermissionDenied => ConfigError::PermissionDenied {
                path: path.display().to_string(),
            },
            _ => ConfigError::ValidationFailed {
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Override fields from environment-style variables provided by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("REDDIT_CLIENT_ID") {
            self.reddit.client_id = Some(value);
        }
        if let Some(value) = get("REDDIT_CLIENT_SECRET") {
            self.reddit.client_secret = Some(value);
        }
        if let Some(value) = get("REDDIT_USERNAME") {
            self.reddit.username = Some(value);
        }
        if let Some(value) = get("REDDIT_PASSWORD") {
            self.reddit.password = Some(value);
        }
        if let Some(value) = get("REDDIT_USER_AGENT") {
            self.reddit.user_agent = value;
        }
        if let Some(value) = get("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(value);
        }
        if let Some(value) = get("OPENAI_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = get("DATABASE_URL") {
            self.database_url = value;
        }
        if let Some(value) = get("BIND_ADDRESS") {
            self.bind_address = value;
        }
        if let Some(value) = get("POLLING_INTERVAL_MINUTES") {
            self.polling_interval_minutes =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "POLLING_INTERVAL_MINUTES".to_string(),
                        value,
                    })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.batch_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.pipeline.post_limit == 0 || self.pipeline.post_limit > 100 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.post_limit".to_string(),
                value: self.pipeline.post_limit.to_string(),
            });
        }
        if self.pipeline.recency_window_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.recency_window_hours".to_string(),
                value: self.pipeline.recency_window_hours.to_string(),
            });
        }
        if self.pipeline.subreddit_cache_hours < 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.subreddit_cache_hours".to_string(),
                value: self.pipeline.subreddit_cache_hours.to_string(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "llm.temperature".to_string(),
                value: self.llm.temperature.to_string(),
            });
        }
        if self.polling_interval_minutes == 0 {
            return Err(ConfigError::ValidationFailed {
                reason: "polling_interval_minutes must be at least 1".to_string(),
            });
        }
        if self.reddit.user_agent.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "reddit.user_agent".to_string(),
            });
        }
        Ok(())
    }
}

impl RedditConfig {
    /// Fetch a credential, reporting the environment variable that would supply it.
    pub fn require(&self, field: RedditCredentialField) -> Result<String, ConfigError> {
        let (value, var_name) = match field {
            RedditCredentialField::ClientId => (&self.client_id, "REDDIT_CLIENT_ID"),
            RedditCredentialField::ClientSecret => (&self.client_secret, "REDDIT_CLIENT_SECRET"),
            RedditCredentialField::Username => (&self.username, "REDDIT_USERNAME"),
            RedditCredentialField::Password => (&self.password, "REDDIT_PASSWORD"),
        };
        value
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                var_name: var_name.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedditCredentialField {
    ClientId,
    ClientSecret,
    Username,
    Password,
}

impl LlmConfig {
    pub fn require_api_key(&self) -> Result<String, ConfigError> {
        self.openai_api_key
            .clone()
            .ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                var_name: "OPENAI_API_KEY".to_string(),
            })
    }
}

fn parse_default_url(raw: &str) -> Url {
    Url::parse(raw).unwrap_or_else(|e| panic!("built-in URL {raw} is invalid: {e}"))
}

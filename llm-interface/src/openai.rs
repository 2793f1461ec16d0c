use crate::prompt::{response_format, user_prompt, SYSTEM_PROMPT};
use crate::Categorizer;
use analytics_core::{
    CategoryFlags, ClassificationError, ClassificationResult, ConfigError, LlmConfig,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

const PROVIDER: &str = "openai";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    response_format: serde_json::Value,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Chat-completions categorizer using a strict JSON-schema response format.
pub struct OpenAiProvider {
    http_client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    api_base: Url,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(api_key: String, config: &LlmConfig) -> Result<Self, ClassificationError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ClassificationError::Network {
                provider: PROVIDER.to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        let mut api_base = config.api_base.clone();
        if !api_base.path().ends_with('/') {
            let path = format!("{}/", api_base.path());
            api_base.set_path(&path);
        }

        Ok(Self {
            http_client,
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            api_base,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?;
        Self::new(api_key, config).map_err(|e| ConfigError::ValidationFailed {
            reason: e.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> Result<Url, ClassificationError> {
        self.api_base
            .join("chat/completions")
            .map_err(|e| ClassificationError::Network {
                provider: PROVIDER.to_string(),
                reason: format!("invalid API base: {}", e),
            })
    }

    fn status_error(status: StatusCode, retry_after: Option<u64>) -> ClassificationError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClassificationError::InvalidApiKey {
                provider: PROVIDER.to_string(),
            },
            StatusCode::TOO_MANY_REQUESTS => ClassificationError::RateLimitExceeded {
                provider: PROVIDER.to_string(),
                retry_after: retry_after.unwrap_or(60),
            },
            status if status.is_server_error() => ClassificationError::ServiceUnavailable {
                provider: PROVIDER.to_string(),
            },
            status => ClassificationError::RequestFailed {
                provider: PROVIDER.to_string(),
                status_code: status.as_u16(),
            },
        }
    }
}

/// Validate the assistant message against the category schema.
///
/// Anything but exactly the five boolean fields is rejected.
pub fn parse_analysis(raw: &str) -> Result<ClassificationResult, ClassificationError> {
    let flags: CategoryFlags =
        serde_json::from_str(raw).map_err(|e| ClassificationError::InvalidResponseFormat {
            provider: PROVIDER.to_string(),
            details: e.to_string(),
        })?;
    Ok(ClassificationResult::from(flags))
}

#[async_trait]
impl Categorizer for OpenAiProvider {
    async fn classify(
        &self,
        title: &str,
        content: &str,
    ) -> Result<ClassificationResult, ClassificationError> {
        if title.trim().is_empty() {
            return Err(ClassificationError::EmptyTitle);
        }

        let prompt = user_prompt(title, content);
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            response_format: response_format(),
        };

        let response = self
            .http_client
            .post(self.endpoint()?)
            .bearer_auth(self.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("OpenAI request failed: {}", e);
                if e.is_timeout() {
                    ClassificationError::RequestTimeout {
                        provider: PROVIDER.to_string(),
                    }
                } else {
                    ClassificationError::Network {
                        provider: PROVIDER.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            warn!("OpenAI returned {}: {}", status, text);
            return Err(Self::status_error(status, retry_after));
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| ClassificationError::InvalidResponseFormat {
                    provider: PROVIDER.to_string(),
                    details: format!("failed to parse completion: {}", e),
                })?;

        let choice = parsed.choices.into_iter().next().ok_or_else(|| {
            ClassificationError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
                details: "completion contained no choices".to_string(),
            }
        })?;

        if let Some(reason) = choice.message.refusal {
            return Err(ClassificationError::Refused { reason });
        }

        let content = choice.message.content.ok_or_else(|| {
            ClassificationError::InvalidResponseFormat {
                provider: PROVIDER.to_string(),
                details: format!(
                    "empty message content (finish_reason: {})",
                    choice.finish_reason.as_deref().unwrap_or("unknown")
                ),
            }
        })?;

        let result = parse_analysis(&content)?;
        debug!("Categorized '{}' as {:?}", title, result.categories());
        Ok(result)
    }
}

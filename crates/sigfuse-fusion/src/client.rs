//! Generation-service boundary.
//!
//! The pipeline sees the service only through [`GenerationService`]: a prompt
//! goes in, text comes out. [`ChatCompletionsClient`] speaks the
//! OpenAI-compatible `/chat/completions` protocol; [`UnavailableService`]
//! stands in when no credentials are configured.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sigfuse_core::LlmConfig;

use crate::error::FusionError;
use crate::retry::RetryPolicy;

/// One request to the generation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Ask for a JSON object instead of free text.
    pub want_structured: bool,
}

impl GenerationRequest {
    #[must_use]
    pub fn narrative(prompt: String) -> Self {
        Self {
            prompt,
            want_structured: false,
        }
    }

    #[must_use]
    pub fn structured(prompt: String) -> Self {
        Self {
            prompt,
            want_structured: true,
        }
    }
}

/// Black-box text generation capability.
pub trait GenerationService: Send + Sync {
    /// Returns the raw response text (free text, or JSON for structured requests).
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, FusionError>>;
}

/// Service used when no API key is configured; every call fails, which the
/// adapter turns into fallback output.
#[derive(Debug, Clone, Default)]
pub struct UnavailableService;

impl GenerationService for UnavailableService {
    fn generate<'a>(
        &'a self,
        _request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, FusionError>> {
        async {
            Err(FusionError::NotConfigured(
                "set SIGFUSE_LLM_API_KEY to enable narrative and concept generation".to_string(),
            ))
        }
        .boxed()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct ChatCompletionsClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl ChatCompletionsClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::NotConfigured`] if no API key is set, or
    /// [`FusionError::Http`] if the `reqwest::Client` cannot be constructed.
    pub fn from_config(config: &LlmConfig) -> Result<Self, FusionError> {
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            FusionError::NotConfigured("SIGFUSE_LLM_API_KEY is not set".to_string())
        })?;
        let mut client = Self::with_base_url(
            api_key,
            &config.model,
            &config.base_url,
            config.timeout_secs,
        )?;
        client.retry = RetryPolicy::from_config(config);
        Ok(client)
    }

    /// Creates a client with a custom base URL and no retries (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Http`] if the `reqwest::Client` cannot be constructed.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        base_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, FusionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("sigfuse/0.1 (signal-fusion)")
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            retry: RetryPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_retries(mut self, max_retries: u32, retry_backoff_base_ms: u64) -> Self {
        self.retry = RetryPolicy::new(max_retries, retry_backoff_base_ms);
        self
    }

    /// Sends one completion request and returns the first choice's content.
    ///
    /// # Errors
    ///
    /// - [`FusionError::Http`] on network failure.
    /// - [`FusionError::Status`] on a non-2xx status.
    /// - [`FusionError::Deserialize`] if the envelope does not match the
    ///   chat-completions shape.
    /// - [`FusionError::EmptyResponse`] if no choice carries content.
    pub async fn complete(&self, request: &GenerationRequest) -> Result<String, FusionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            response_format: request.want_structured.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(FusionError::Status {
                status: status.as_u16(),
                body: truncate(&text, 200),
            });
        }

        let envelope: ChatResponse =
            serde_json::from_str(&text).map_err(|e| FusionError::Deserialize {
                context: "chat completion envelope".to_string(),
                source: e,
            })?;

        envelope
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(FusionError::EmptyResponse)
    }
}

impl GenerationService for ChatCompletionsClient {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> BoxFuture<'a, Result<String, FusionError>> {
        self.retry.run(move || self.complete(request)).boxed()
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_requires_api_key() {
        let err = ChatCompletionsClient::from_config(&LlmConfig::default())
            .err()
            .expect("missing key must fail");
        assert!(matches!(err, FusionError::NotConfigured(_)));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let client =
            ChatCompletionsClient::with_base_url("k", "m", "http://localhost:9/v1/", 5).unwrap();
        assert_eq!(client.endpoint, "http://localhost:9/v1/chat/completions");
    }

    #[test]
    fn structured_request_asks_for_json_object() {
        let body = ChatRequest {
            model: "m",
            messages: [ChatMessage {
                role: "user",
                content: "hi",
            }],
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn unavailable_service_always_fails() {
        let request = GenerationRequest::narrative("anything".to_string());
        let err = UnavailableService.generate(&request).await.unwrap_err();
        assert!(matches!(err, FusionError::NotConfigured(_)));
    }
}

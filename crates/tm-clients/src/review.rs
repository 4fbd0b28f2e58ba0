//! AI review service: the seam between the pipeline and the model.
//!
//! The pipeline only sees [`ReviewService`]. [`AnthropicClient`] implements it
//! against a Messages-style HTTP API, [`RetryingReviewService`] wraps any
//! implementation with the bounded retry policy, and tests plug in in-process
//! fakes.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tm_config::ReviewConfig;

use crate::error::ClientError;
use crate::http::{build_client, check_response};
use crate::retry::{RetryPolicy, with_retry};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Which pipeline step a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewTask {
    TitleScreening,
    AbstractScreening,
    Validation,
    ObservationExtraction,
}

impl ReviewTask {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TitleScreening => "title_screening",
            Self::AbstractScreening => "abstract_screening",
            Self::Validation => "validation",
            Self::ObservationExtraction => "observation_extraction",
        }
    }

    /// Screening stages run on the cheaper model.
    #[must_use]
    pub const fn is_screening(self) -> bool {
        matches!(self, Self::TitleScreening | Self::AbstractScreening)
    }
}

impl std::fmt::Display for ReviewTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to the review service.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    pub task: ReviewTask,
    /// Standing instructions for the task.
    pub instructions: String,
    /// Publication excerpt plus task payload (candidates, batch items).
    pub body: String,
    /// JSON Schema the answer must satisfy.
    pub schema: Option<serde_json::Value>,
}

impl ReviewRequest {
    #[must_use]
    pub fn new(task: ReviewTask, instructions: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            task,
            instructions: instructions.into(),
            body: body.into(),
            schema: None,
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// The user message: body followed by the schema the answer must match.
    #[must_use]
    pub fn user_message(&self) -> String {
        match &self.schema {
            Some(schema) => format!(
                "{}\n\nRespond with a single JSON document that validates against this JSON Schema:\n{}",
                self.body,
                serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string())
            ),
            None => self.body.clone(),
        }
    }
}

/// A service that answers review requests with free text containing a JSON
/// document.
#[async_trait]
pub trait ReviewService: Send + Sync {
    /// Send one request and return the raw response text.
    async fn complete(&self, request: &ReviewRequest) -> Result<String, ClientError>;
}

#[async_trait]
impl<S: ReviewService + ?Sized> ReviewService for Arc<S> {
    async fn complete(&self, request: &ReviewRequest) -> Result<String, ClientError> {
        (**self).complete(request).await
    }
}

// ── Messages API client ────────────────────────────────────────────

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message; 1],
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Client for an Anthropic-style Messages endpoint.
pub struct AnthropicClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    screening_model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConfigured`] without an API key, or
    /// [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ReviewConfig) -> Result<Self, ClientError> {
        if !config.is_configured() {
            return Err(ClientError::NotConfigured("review service"));
        }
        Ok(Self {
            http: build_client(config.timeout_secs)?,
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            screening_model: config.screening_model().to_string(),
            max_tokens: config.max_tokens,
        })
    }

    fn model_for(&self, task: ReviewTask) -> &str {
        if task.is_screening() { &self.screening_model } else { &self.model }
    }
}

#[async_trait]
impl ReviewService for AnthropicClient {
    async fn complete(&self, request: &ReviewRequest) -> Result<String, ClientError> {
        let model = self.model_for(request.task);
        let body = MessagesRequest {
            model,
            max_tokens: self.max_tokens,
            system: &request.instructions,
            messages: [Message {
                role: "user",
                content: request.user_message(),
            }],
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        let resp = check_response(resp).await?;
        let data: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| ClientError::Parse(format!("messages response: {e}")))?;

        if data.stop_reason.as_deref() == Some("max_tokens") {
            tracing::warn!(task = %request.task, model, "response truncated at max_tokens");
        }
        Ok(response_text(data))
    }
}

fn response_text(data: MessagesResponse) -> String {
    data.content
        .into_iter()
        .filter(|block| block.kind == "text")
        .map(|block| block.text)
        .collect::<Vec<_>>()
        .join("")
}

// ── Retry wrapper ──────────────────────────────────────────────────

/// Applies a [`RetryPolicy`] to every call of the wrapped service.
pub struct RetryingReviewService<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: ReviewService> RetryingReviewService<S> {
    #[must_use]
    pub const fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<S: ReviewService> ReviewService for RetryingReviewService<S> {
    async fn complete(&self, request: &ReviewRequest) -> Result<String, ClientError> {
        with_retry(&self.policy, request.task.as_str(), || self.inner.complete(request)).await
    }
}

/// Review service built from configuration, with retries applied.
///
/// # Errors
///
/// Returns [`ClientError::NotConfigured`] without an API key.
pub fn review_service_from_config(config: &ReviewConfig) -> Result<Arc<dyn ReviewService>, ClientError> {
    let client = AnthropicClient::new(config)?;
    Ok(Arc::new(RetryingReviewService::new(client, RetryPolicy::from_config(config))))
}

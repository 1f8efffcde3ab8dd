/// LLM Client: the single point of entry for all completion API calls.
///
/// ARCHITECTURAL RULE: No other module talks HTTP to the completion API.
/// Callers depend on `CompletionBackend`; `LlmClient` is the production
/// implementation against an OpenAI-compatible `/chat/completions` endpoint.
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod sse;
#[cfg(test)]
pub mod testing;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// Whether the chat assembler may re-issue the request.
    ///
    /// Anything that can clear on its own is transient: transport faults,
    /// undecodable or in-band stream errors, 429 and 5xx. Other 4xx statuses
    /// (bad key, bad request, unknown model) and empty content fail the same
    /// way on every attempt and are not retried.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(_)
            | LlmError::Transport(_)
            | LlmError::Parse(_)
            | LlmError::Stream(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::EmptyContent => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A completion request as the callers see it. Whether it streams is
/// decided by which `CompletionBackend` method receives it.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

/// One incremental unit of a streaming response. A fragment may carry no text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    pub delta: Option<String>,
}

impl Fragment {
    pub fn text(&self) -> &str {
        self.delta.as_deref().unwrap_or("")
    }
}

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, LlmError>> + Send>>;

/// The seam between the orchestration core and the remote model.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Issues exactly one non-streaming completion call.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;

    /// Opens a streaming completion. `Ok(None)` means the remote side
    /// answered without a stream, which callers treat as a contract violation.
    async fn stream(&self, request: &CompletionRequest)
        -> Result<Option<FragmentStream>, LlmError>;
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl CompletionResponse {
    /// Extracts the text content of the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Wraps the chat completions API. Holds no per-session state.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Sends the request and maps non-2xx statuses to `LlmError::Api`.
    async fn send(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let body = OpenAiRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            stream,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            warn!("Completion API returned {}: {}", status, message);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let response = self.send(request, false).await?;
        let body = response.bytes().await?;
        let parsed: CompletionResponse = serde_json::from_slice(&body)?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "Completion succeeded: model={}, prompt_tokens={}, completion_tokens={}",
                request.model, usage.prompt_tokens, usage.completion_tokens
            );
        }

        match parsed.text() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(LlmError::EmptyContent),
        }
    }

    async fn stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<Option<FragmentStream>, LlmError> {
        let response = self.send(request, true).await?;

        if !is_event_stream(response.headers()) {
            warn!(
                "Streaming request for model {} answered without an event stream",
                request.model
            );
            return Ok(None);
        }

        let bytes = response.bytes_stream().map_err(LlmError::from);
        let fragments: FragmentStream = Box::pin(sse::decode_fragments(bytes));
        Ok(Some(fragments))
    }
}

fn is_event_stream(headers: &header::HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/event-stream"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_roles_lowercase() {
        let messages = vec![
            ChatMessage::system("You are an ATS resume analyzer."),
            ChatMessage::user("Analyze this"),
        ];
        let body = OpenAiRequest {
            model: "gpt-4",
            messages: &messages,
            max_tokens: 1500,
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 1500);
        assert!(json.get("stream").is_none());
    }

    #[test]
    fn test_streaming_request_sets_flag() {
        let body = OpenAiRequest {
            model: "gpt-4o",
            messages: &[],
            max_tokens: 150,
            stream: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], true);
    }

    #[test]
    fn test_completion_response_text() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Score: 72/100"}}],
            "usage": {"prompt_tokens": 812, "completion_tokens": 403, "total_tokens": 1215}
        }"#;
        let parsed: CompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.text(), Some("Score: 72/100"));
        assert_eq!(parsed.usage.unwrap().completion_tokens, 403);
    }

    #[test]
    fn test_completion_response_without_choices_has_no_text() {
        let parsed: CompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(parsed.text().is_none());
    }

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Transport("connection reset".to_string()).is_transient());
        assert!(LlmError::Api { status: 429, message: "slow down".to_string() }.is_transient());
        assert!(LlmError::Api { status: 503, message: "overloaded".to_string() }.is_transient());
        assert!(!LlmError::Api { status: 401, message: "bad key".to_string() }.is_transient());
        assert!(!LlmError::EmptyContent.is_transient());
        assert!(LlmError::Stream("server overloaded".to_string()).is_transient());
    }

    #[test]
    fn test_fragment_without_delta_is_empty_text() {
        assert_eq!(Fragment::default().text(), "");
        let fragment = Fragment {
            delta: Some("Hello".to_string()),
        };
        assert_eq!(fragment.text(), "Hello");
    }

    #[test]
    fn test_event_stream_detection() {
        let mut headers = header::HeaderMap::new();
        assert!(!is_event_stream(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("text/event-stream; charset=utf-8"),
        );
        assert!(is_event_stream(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        assert!(!is_event_stream(&headers));
    }
}

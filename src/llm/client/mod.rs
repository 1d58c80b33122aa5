//! LLM client for narrative segmentation.
//!
//! Supports the OpenAI Responses API, OpenAI-compatible chat completions,
//! and Ollama.

mod config;
mod prompts;

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub use config::{LlmConfig, LlmProvider};
pub use prompts::DEFAULT_SEGMENTATION_PROMPT;

/// LLM client for story annotation.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

/// OpenAI Responses API request format.
#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<ResponseItem>,
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ResponseItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Vec<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Chat completions request format.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| LlmError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Send one story with the given instructions and return the raw response text.
    ///
    /// The text is returned as is, even when empty.
    pub async fn complete(&self, instructions: &str, input: &str) -> Result<String, LlmError> {
        debug!(
            "Sending {} bytes to {} ({})",
            input.len(),
            self.config.provider.as_str(),
            self.config.model
        );
        match self.config.provider {
            LlmProvider::OpenAI => self.call_responses(instructions, input).await,
            LlmProvider::Chat => self.call_chat(instructions, input).await,
            LlmProvider::Ollama => self.call_ollama(instructions, input).await,
        }
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(LlmError::MissingApiKey)
    }

    async fn call_responses(&self, instructions: &str, input: &str) -> Result<String, LlmError> {
        let request = ResponsesRequest {
            model: &self.config.model,
            instructions,
            input,
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        };
        let url = format!("{}/v1/responses", self.config.effective_endpoint());
        let req = self
            .client
            .post(&url)
            .bearer_auth(self.api_key()?)
            .json(&request);
        let body = send(req).await?;
        parse_responses_output(&body)
    }

    async fn call_chat(&self, instructions: &str, input: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instructions,
                },
                ChatMessage {
                    role: "user",
                    content: input,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_output_tokens,
        };
        let url = format!("{}/v1/chat/completions", self.config.effective_endpoint());
        let req = self
            .client
            .post(&url)
            .bearer_auth(self.api_key()?)
            .json(&request);
        let body = send(req).await?;
        parse_chat_output(&body)
    }

    async fn call_ollama(&self, instructions: &str, input: &str) -> Result<String, LlmError> {
        let request = OllamaRequest {
            model: &self.config.model,
            system: instructions,
            prompt: input,
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: self.config.max_output_tokens,
            },
        };
        let url = format!("{}/api/generate", self.config.effective_endpoint());
        let body = send(self.client.post(&url).json(&request)).await?;
        let resp: OllamaResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;
        Ok(resp.response)
    }
}

/// Send a request and return the body of a successful response.
async fn send(req: reqwest::RequestBuilder) -> Result<String, LlmError> {
    let resp = req.send().await.map_err(LlmError::from_transport)?;
    let status = resp.status();
    let retry_after = resp
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok());
    let body = resp.text().await.map_err(LlmError::from_transport)?;

    if !status.is_success() {
        return Err(error_for_status(status, retry_after, &body));
    }
    Ok(body)
}

/// Map a non-success HTTP status to a typed error.
pub fn error_for_status(status: StatusCode, retry_after_secs: Option<u64>, body: &str) -> LlmError {
    let message = api_error_message(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Unauthorized(message),
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited { retry_after_secs },
        _ => LlmError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Extract the service's error message, falling back to the raw body.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => {
            let body = body.trim();
            match body.char_indices().nth(200) {
                Some((end, _)) => format!("{}...", &body[..end]),
                None => body.to_string(),
            }
        }
    }
}

/// Concatenate all `output_text` parts of a Responses API reply.
fn parse_responses_output(body: &str) -> Result<String, LlmError> {
    let resp: ResponsesResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;
    if let Some(error) = resp.error {
        return Err(LlmError::Api {
            status: 200,
            message: error.message,
        });
    }

    Ok(resp
        .output
        .iter()
        .filter(|item| item.kind == "message")
        .flat_map(|item| item.content.iter())
        .filter(|part| part.kind == "output_text")
        .filter_map(|part| part.text.as_deref())
        .collect())
}

fn parse_chat_output(body: &str) -> Result<String, LlmError> {
    let resp: ChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;
    if let Some(error) = resp.error {
        return Err(LlmError::Api {
            status: 200,
            message: error.message,
        });
    }

    Ok(resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default())
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("No API key configured (set OPENAI_API_KEY or LLM_API_KEY)")]
    MissingApiKey,

    #[error("Invalid credential: {0}")]
    Unauthorized(String),

    #[error("Rate limited{}", .retry_after_secs.map(|s| format!(" (retry after {}s)", s)).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl LlmError {
    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout(e.to_string())
        } else {
            LlmError::Connection(e.to_string())
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Connection(_) | LlmError::Timeout(_) | LlmError::RateLimited { .. } => true,
            LlmError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the failure comes from missing or rejected credentials.
    pub fn is_credential(&self) -> bool {
        matches!(self, LlmError::MissingApiKey | LlmError::Unauthorized(_))
    }

    /// Server-requested delay before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited {
                retry_after_secs: Some(secs),
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_responses_output() {
        let body = r#"{
            "id": "resp_1",
            "output": [
                {"type": "reasoning", "content": []},
                {"type": "message", "role": "assistant", "content": [
                    {"type": "output_text", "text": "{\"beginning\": "},
                    {"type": "refusal", "refusal": "no"},
                    {"type": "output_text", "text": "\"a... b\"}"}
                ]}
            ]
        }"#;
        assert_eq!(
            parse_responses_output(body).unwrap(),
            r#"{"beginning": "a... b"}"#
        );
    }

    #[test]
    fn test_parse_responses_error_body() {
        let body = r#"{"output": [], "error": {"message": "content policy", "code": "x"}}"#;
        let err = parse_responses_output(body).unwrap_err();
        assert!(matches!(err, LlmError::Api { ref message, .. } if message == "content policy"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_parse_chat_output() {
        let body = r#"{"choices": [{"index": 0, "message": {"role": "assistant", "content": "hi"}}]}"#;
        assert_eq!(parse_chat_output(body).unwrap(), "hi");
        assert_eq!(parse_chat_output(r#"{"choices": []}"#).unwrap(), "");
    }

    #[test]
    fn test_parse_responses_without_message_is_empty() {
        let body = r#"{"output": [{"type": "reasoning", "content": []}]}"#;
        assert_eq!(parse_responses_output(body).unwrap(), "");
    }

    #[test]
    fn test_responses_request_body() {
        let request = ResponsesRequest {
            model: "gpt-4o",
            instructions: "Segment this story.",
            input: "Once upon a time.",
            temperature: None,
            max_output_tokens: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "model": "gpt-4o",
                "instructions": "Segment this story.",
                "input": "Once upon a time.",
            })
        );

        let request = ResponsesRequest {
            temperature: Some(0.5),
            max_output_tokens: Some(800),
            ..request
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["max_output_tokens"], 800);
    }

    #[test]
    fn test_chat_request_body() {
        let request = ChatRequest {
            model: "llama-3.1-8b-instant",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "Segment this story.",
                },
                ChatMessage {
                    role: "user",
                    content: "Once upon a time.",
                },
            ],
            temperature: None,
            max_tokens: Some(800),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "model": "llama-3.1-8b-instant",
                "messages": [
                    {"role": "system", "content": "Segment this story."},
                    {"role": "user", "content": "Once upon a time."},
                ],
                "max_tokens": 800,
            })
        );
    }

    #[test]
    fn test_ollama_request_body() {
        let request = OllamaRequest {
            model: "llama3",
            system: "Segment this story.",
            prompt: "Once upon a time.",
            stream: false,
            options: OllamaOptions {
                temperature: None,
                num_predict: None,
            },
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "model": "llama3",
                "system": "Segment this story.",
                "prompt": "Once upon a time.",
                "stream": false,
                "options": {},
            })
        );
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_responses_output("<html>"),
            Err(LlmError::Parse(_))
        ));
    }

    #[test]
    fn test_error_for_status_classification() {
        let body = r#"{"error": {"message": "Incorrect API key provided"}}"#;
        let err = error_for_status(StatusCode::UNAUTHORIZED, None, body);
        assert!(matches!(err, LlmError::Unauthorized(ref m) if m == "Incorrect API key provided"));
        assert!(err.is_credential());
        assert!(!err.is_transient());

        let err = error_for_status(StatusCode::TOO_MANY_REQUESTS, Some(7), "");
        assert!(err.is_transient());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(err.to_string(), "Rate limited (retry after 7s)");

        let err = error_for_status(StatusCode::BAD_GATEWAY, None, "upstream down");
        assert!(matches!(err, LlmError::Api { status: 502, ref message } if message == "upstream down"));
        assert!(err.is_transient());

        let err = error_for_status(StatusCode::BAD_REQUEST, None, "context too long");
        assert!(!err.is_transient());
        assert!(!err.is_credential());
    }

    #[test]
    fn test_missing_api_key() {
        let client = LlmClient::new(LlmConfig::base_default()).unwrap();
        assert!(matches!(client.api_key(), Err(LlmError::MissingApiKey)));
        assert!(LlmError::MissingApiKey.is_credential());
    }

    #[test]
    fn test_long_error_body_truncated() {
        let body = "x".repeat(500);
        let msg = api_error_message(&body);
        assert_eq!(msg.len(), 203);
    }
}

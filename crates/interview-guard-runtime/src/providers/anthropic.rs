//! Anthropic Messages API provider.
//!
//! Available with the `anthropic` feature. The provider performs a single
//! HTTP exchange per call and maps failures onto [`ProviderError`] so the
//! orchestrator can decide what is worth retrying.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    secrets::{ApiCredential, CredentialSource},
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, Role,
    TokenUsage,
};

/// Environment variable holding the API key.
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const CREDENTIAL_NAME: &str = "Anthropic API key";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Provider for Claude models over the Messages API.
pub struct AnthropicProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl AnthropicProvider {
    /// Create a provider from an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let credential = ApiCredential::new(api_key, CredentialSource::Programmatic, CREDENTIAL_NAME);
        Self::with_credential(credential)
    }

    /// Create a provider keyed from [`ANTHROPIC_API_KEY_ENV`].
    pub fn from_env() -> Result<Self, ProviderError> {
        let credential = ApiCredential::from_env(ANTHROPIC_API_KEY_ENV, CREDENTIAL_NAME)?;
        Self::with_credential(credential)
    }

    fn with_credential(credential: ApiCredential) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Point the provider at another endpoint (proxy, gateway, test server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.base_url)
    }
}

// Request body. Borrows from the caller's messages; nothing is copied.

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    system: Vec<TextBlock<'a>>,
    messages: Vec<Turn<'a>>,
}

#[derive(Debug, Serialize)]
struct Turn<'a> {
    role: &'a str,
    content: [TextBlock<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextBlock<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache_control: Option<Ephemeral>,
}

impl<'a> TextBlock<'a> {
    fn new(text: &'a str, cached: bool) -> Self {
        Self {
            kind: "text",
            text,
            cache_control: cached.then_some(Ephemeral { kind: "ephemeral" }),
        }
    }
}

#[derive(Debug, Serialize)]
struct Ephemeral {
    #[serde(rename = "type")]
    kind: &'static str,
}

// Response body.

#[derive(Debug, Deserialize)]
struct MessagesReply {
    model: String,
    #[serde(default)]
    content: Vec<ReplyBlock>,
    stop_reason: Option<String>,
    usage: ReplyUsage,
}

#[derive(Debug, Deserialize)]
struct ReplyBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ReplyUsage {
    input_tokens: u32,
    output_tokens: u32,
    #[serde(default)]
    cache_creation_input_tokens: u32,
    #[serde(default)]
    cache_read_input_tokens: u32,
}

impl From<ReplyUsage> for TokenUsage {
    fn from(usage: ReplyUsage) -> Self {
        TokenUsage {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            cache_read_tokens: usage.cache_read_input_tokens,
            cache_creation_tokens: usage.cache_creation_input_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// System turns go to the top-level `system` field; the rest stay in order.
fn build_request<'a>(messages: &'a [ChatMessage], config: &'a CompletionConfig) -> MessagesRequest<'a> {
    let (system, turns): (Vec<&ChatMessage>, Vec<&ChatMessage>) =
        messages.iter().partition(|m| m.role == Role::System);

    MessagesRequest {
        model: &config.model,
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        system: system
            .into_iter()
            .map(|m| TextBlock::new(&m.content, config.prompt_caching))
            .collect(),
        messages: turns
            .into_iter()
            .map(|m| Turn {
                role: m.role.as_str(),
                content: [TextBlock::new(&m.content, false)],
            })
            .collect(),
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Map a non-success response onto the error the retry policy understands.
fn status_error(status: StatusCode, retry_after: Option<Duration>, body: &str) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited { retry_after },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthError,
        _ => ProviderError::ApiError {
            status: status.as_u16(),
            message: serde_json::from_str::<ErrorEnvelope>(body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.trim().to_string()),
        },
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = build_request(&messages, config);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", self.credential.expose())
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let wait = retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, wait, &body));
        }

        let reply: MessagesReply = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let content: String = reply
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();

        Ok(CompletionResponse {
            content,
            usage: reply.usage.into(),
            model: reply.model,
            stop_reason: reply.stop_reason,
        })
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let provider = AnthropicProvider::new("test-key").unwrap();
        assert_eq!(provider.endpoint(), "https://api.anthropic.com/v1/messages");

        let provider = provider.with_base_url("http://localhost:8080/v1/");
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/messages");
    }

    #[test]
    fn test_key_never_in_debug_output() {
        let key = "sk-ant-0123456789abcdef";
        let provider = AnthropicProvider::new(key).unwrap();

        let debug = format!("{:?}", provider);
        assert!(!debug.contains(key));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_health_check_requires_key() {
        assert!(AnthropicProvider::new("key").unwrap().health_check().await);
        assert!(!AnthropicProvider::new("").unwrap().health_check().await);
    }

    #[test]
    fn test_request_splits_system_prompt() {
        let messages = vec![
            ChatMessage::system("rules"),
            ChatMessage::user("questions"),
            ChatMessage::assistant("previous"),
            ChatMessage::user("repair"),
        ];
        let config = CompletionConfig::default();
        let value = serde_json::to_value(build_request(&messages, &config)).unwrap();

        assert_eq!(value["system"][0]["text"], "rules");
        assert_eq!(value["system"][0]["cache_control"]["type"], "ephemeral");
        assert_eq!(value["messages"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["messages"][1]["role"], "assistant");
        assert_eq!(value["messages"][2]["content"][0]["type"], "text");
        assert!(value["messages"][0]["content"][0].get("cache_control").is_none());
        assert_eq!(value["temperature"], 0.0);
    }

    #[test]
    fn test_caching_can_be_disabled() {
        let messages = vec![ChatMessage::system("rules"), ChatMessage::user("q")];
        let config = CompletionConfig {
            prompt_caching: false,
            ..Default::default()
        };
        let value = serde_json::to_value(build_request(&messages, &config)).unwrap();
        assert!(value["system"][0].get("cache_control").is_none());
    }

    #[test]
    fn test_status_mapping() {
        let limited = status_error(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(7)), "");
        assert_eq!(
            limited,
            ProviderError::RateLimited {
                retry_after: Some(Duration::from_secs(7))
            }
        );
        assert!(limited.is_transient());

        assert_eq!(status_error(StatusCode::FORBIDDEN, None, ""), ProviderError::AuthError);

        let overloaded = status_error(
            StatusCode::from_u16(529).unwrap(),
            None,
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        );
        assert_eq!(
            overloaded,
            ProviderError::ApiError {
                status: 529,
                message: "Overloaded".to_string()
            }
        );
        assert!(overloaded.is_transient());

        let bad_request = status_error(StatusCode::BAD_REQUEST, None, "plain text\n");
        assert!(matches!(
            &bad_request,
            ProviderError::ApiError { status: 400, message } if message == "plain text"
        ));
        assert!(!bad_request.is_transient());
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(RETRY_AFTER, "12".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(12)));
    }

    #[test]
    fn test_reply_parsing() {
        let reply: MessagesReply = serde_json::from_str(
            r#"{
                "model": "claude-sonnet-4-5",
                "content": [{"type": "text", "text": "{\"items\": "}, {"type": "text", "text": "[]}"}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 900, "output_tokens": 40, "cache_read_input_tokens": 800}
            }"#,
        )
        .unwrap();

        let text: String = reply.content.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(text, r#"{"items": []}"#);

        let usage = TokenUsage::from(reply.usage);
        assert_eq!(usage.prompt_tokens, 900);
        assert_eq!(usage.cache_read_tokens, 800);
        assert_eq!(usage.cache_creation_tokens, 0);
    }
}

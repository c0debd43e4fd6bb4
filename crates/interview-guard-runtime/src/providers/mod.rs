//! Model provider seam.
//!
//! The orchestrator reaches a model only through [`LlmProvider`]. Whatever a
//! provider returns is untrusted text; nothing in this module interprets it.
//!
//! API keys live in [`secrets::ApiCredential`] and are exposed only when a
//! request is sent.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

mod scripted;
pub mod secrets;

#[cfg(feature = "anthropic")]
mod anthropic;

pub use scripted::{ScriptedProvider, ScriptedReply};
pub use secrets::{ApiCredential, CredentialSource};

#[cfg(feature = "anthropic")]
pub use anthropic::{AnthropicProvider, ANTHROPIC_API_KEY_ENV};

/// A failed model call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("transport failure: {0}")]
    HttpError(String),

    #[error("rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("provider returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("unreadable provider response: {0}")]
    ParseError(String),

    #[error("credential rejected by provider")]
    AuthError,

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("provider unavailable: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// Whether resending the same request might succeed.
    ///
    /// Network failures, timeouts, rate limits and 5xx responses are
    /// transient; everything else fails the same way on every attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::HttpError(_)
            | ProviderError::Timeout(_)
            | ProviderError::RateLimited { .. } => true,
            ProviderError::ApiError { status, .. } => *status >= 500 || *status == 408,
            ProviderError::ParseError(_)
            | ProviderError::AuthError
            | ProviderError::NotConfigured(_) => false,
        }
    }
}

/// Request settings sent with every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub model: String,

    /// Output token ceiling; must fit N items with quotations
    pub max_tokens: u32,

    /// Kept at 0.0 so repeated runs stay comparable
    pub temperature: f32,

    /// Mark the system prompt cacheable where the provider supports it
    pub prompt_caching: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 4096,
            temperature: 0.0,
            prompt_caching: true,
        }
    }
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of the conversation sent to a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// What a provider returned for one call.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Raw model text, not yet parsed
    pub content: String,

    pub usage: TokenUsage,

    /// Model that actually served the call
    pub model: String,

    pub stop_reason: Option<String>,
}

/// Token counts reported for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    /// Prompt tokens served from the provider's cache
    pub cache_read_tokens: u32,
    /// Prompt tokens written to the provider's cache
    pub cache_creation_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// Token usage summed over the successful calls of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmUsage {
    pub total_tokens: u32,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,

    /// Calls that returned a response
    pub llm_calls: u32,

    pub cache_creation_tokens: u32,
    pub cache_read_tokens: u32,
}

impl LlmUsage {
    /// Fold in the usage of one successful call.
    pub fn add(&mut self, usage: &TokenUsage) {
        self.llm_calls += 1;
        self.total_tokens = self.total_tokens.saturating_add(usage.total());
        self.prompt_tokens = self.prompt_tokens.saturating_add(usage.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(usage.completion_tokens);
        self.cache_read_tokens = self.cache_read_tokens.saturating_add(usage.cache_read_tokens);
        self.cache_creation_tokens = self
            .cache_creation_tokens
            .saturating_add(usage.cache_creation_tokens);
    }
}

/// A model backend.
///
/// One `complete` call is one physical request. Implementations must not
/// retry or time out on their own; `resilience::complete_with_retry` owns both.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send the conversation and return the model's reply.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Cheap local readiness check; makes no network call.
    async fn health_check(&self) -> bool;

    /// Short name used in log fields.
    fn name(&self) -> &str;

    /// Rough token estimate for providers that do not report usage.
    ///
    /// Counts characters rather than bytes so CJK text is not overcounted.
    fn estimate_tokens(&self, text: &str) -> u32 {
        u32::try_from(text.chars().count().div_ceil(2)).unwrap_or(u32::MAX)
    }
}

//! In-memory provider that replays a fixed script.
//!
//! Used by tests and by the CLI's replay mode, where previously captured
//! model outputs are fed through the full repair loop offline.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use super::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};

/// One scripted step.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this text as the completion
    Text(String),

    /// Fail with this error
    Error(ProviderError),

    /// Never complete; the caller's timeout must fire
    Hang,
}

/// Provider that answers from a queue, recording every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedProvider {
    pub fn new(script: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replay plain text outputs in order.
    pub fn from_outputs<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(outputs.into_iter().map(|s| ScriptedReply::Text(s.into())))
    }

    /// Every message list received so far, oldest first.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().clone()
    }

    /// Number of `complete` calls received.
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let prompt_tokens: u32 = messages
            .iter()
            .map(|m| self.estimate_tokens(&m.content))
            .sum();
        self.requests.lock().push(messages);

        let next = self.script.lock().pop_front();
        match next {
            Some(ScriptedReply::Text(content)) => Ok(CompletionResponse {
                usage: TokenUsage {
                    prompt_tokens,
                    completion_tokens: self.estimate_tokens(&content),
                    ..Default::default()
                },
                content,
                model: config.model.clone(),
                stop_reason: Some("end_turn".to_string()),
            }),
            Some(ScriptedReply::Error(error)) => Err(error),
            Some(ScriptedReply::Hang) => std::future::pending().await,
            None => Err(ProviderError::NotConfigured(
                "scripted provider has no replies left".to_string(),
            )),
        }
    }

    async fn health_check(&self) -> bool {
        !self.script.lock().is_empty()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

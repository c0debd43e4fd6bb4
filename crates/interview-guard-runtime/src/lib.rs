//! # interview-guard-runtime
//!
//! The model-calling half of interview-guard.
//!
//! `interview-guard-core` decides what a valid result is and never talks to
//! a model. This crate builds the prompts, calls a provider with bounded
//! transport retries, feeds violations back through a bounded number of
//! repair prompts, and always finishes by clamping the last candidate. An
//! extraction therefore never fails: when everything goes wrong the caller
//! gets every question unanswered plus metadata saying why.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use interview_guard_runtime::{RepairOrchestratorBuilder, RuntimeConfig};
//! use interview_guard_runtime::providers::AnthropicProvider;
//!
//! let orchestrator = RepairOrchestratorBuilder::new()
//!     .provider(Arc::new(AnthropicProvider::from_env()?))
//!     .config(RuntimeConfig::from_env()?)
//!     .build()?;
//!
//! let extraction = orchestrator
//!     .extract_texts(&["出身地は？", "志望動機は？"], transcript)
//!     .await;
//! println!("{}", serde_json::to_string_pretty(&extraction.result)?);
//! ```

use thiserror::Error;

pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod resilience;

pub use config::RuntimeConfig;
pub use orchestrator::{
    Extraction, ExtractionMetadata, RepairAttempt, RepairOrchestrator, RepairOrchestratorBuilder,
};
pub use providers::{LlmProvider, ProviderError};

/// Errors from setting up the runtime.
///
/// Running an extraction does not return these; see [`ExtractionMetadata`].
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Invalid configuration for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    #[error("Invalid evidence limits: {0}")]
    Evidence(#[from] interview_guard_core::ConfigError),

    #[error("Failed to read config file {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_setting() {
        let err = RuntimeError::InvalidConfig {
            key: "call_timeout".to_string(),
            message: "must be greater than zero".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration for call_timeout: must be greater than zero"
        );
    }

    #[test]
    fn test_provider_error_converts() {
        let err: RuntimeError = ProviderError::NotConfigured("no key".to_string()).into();
        assert!(matches!(err, RuntimeError::Provider(_)));
    }
}

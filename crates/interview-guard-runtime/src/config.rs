//! Runtime configuration.
//!
//! Loaded from YAML (every field optional) and then overridden from
//! `INTERVIEW_GUARD_*` environment variables. Durations use humantime
//! notation such as `500ms`, `8s` or `1m 30s`.

use interview_guard_core::config::{MAX_LENGTH_ENV, MIN_LENGTH_ENV};
use interview_guard_core::EvidenceLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::providers::CompletionConfig;
use crate::resilience::TransportRetryConfig;
use crate::RuntimeError;

/// Environment variable overriding [`RuntimeConfig::max_repair_attempts`].
pub const MAX_REPAIR_ATTEMPTS_ENV: &str = "INTERVIEW_GUARD_MAX_REPAIR_ATTEMPTS";

/// Environment variable overriding [`RuntimeConfig::call_timeout`].
pub const CALL_TIMEOUT_ENV: &str = "INTERVIEW_GUARD_CALL_TIMEOUT";

/// Environment variable overriding [`TransportRetryConfig::max_retries`].
pub const MAX_RETRIES_ENV: &str = "INTERVIEW_GUARD_MAX_RETRIES";

/// Environment variable overriding [`CompletionConfig::model`].
pub const MODEL_ENV: &str = "INTERVIEW_GUARD_MODEL";

/// Configuration for the repair orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Accepted quotation lengths
    pub evidence: EvidenceLimits,

    /// Repair prompts allowed after the primary call
    pub max_repair_attempts: u32,

    /// Timeout for each transport attempt
    #[serde(with = "human_duration")]
    pub call_timeout: Duration,

    /// Transport retry policy
    pub transport: TransportRetryConfig,

    /// Model request settings
    pub completion: CompletionConfig,

    /// Provider endpoint override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            evidence: EvidenceLimits::default(),
            max_repair_attempts: 1,
            call_timeout: Duration::from_secs(60),
            transport: TransportRetryConfig::default(),
            completion: CompletionConfig::default(),
            base_url: None,
        }
    }
}

impl RuntimeConfig {
    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuntimeError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RuntimeError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Defaults overridden from the environment.
    pub fn from_env() -> Result<Self, RuntimeError> {
        Self::default().with_env()
    }

    /// Apply environment overrides on top of `self`.
    pub fn with_env(self) -> Result<Self, RuntimeError> {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides through an arbitrary key lookup.
    pub fn with_lookup<F>(mut self, lookup: F) -> Result<Self, RuntimeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if get(MIN_LENGTH_ENV).is_some() || get(MAX_LENGTH_ENV).is_some() {
            let min = get(MIN_LENGTH_ENV).unwrap_or_else(|| self.evidence.min_length.to_string());
            let max = get(MAX_LENGTH_ENV).unwrap_or_else(|| self.evidence.max_length.to_string());
            self.evidence = EvidenceLimits::from_lookup(|key| match key {
                k if k == MIN_LENGTH_ENV => Some(min.clone()),
                k if k == MAX_LENGTH_ENV => Some(max.clone()),
                _ => None,
            })?;
        }

        if let Some(value) = get(MAX_REPAIR_ATTEMPTS_ENV) {
            self.max_repair_attempts = parse_number(MAX_REPAIR_ATTEMPTS_ENV, &value)?;
        }
        if let Some(value) = get(CALL_TIMEOUT_ENV) {
            self.call_timeout =
                humantime::parse_duration(&value).map_err(|e| RuntimeError::InvalidConfig {
                    key: CALL_TIMEOUT_ENV.to_string(),
                    message: e.to_string(),
                })?;
        }
        if let Some(value) = get(MAX_RETRIES_ENV) {
            self.transport.max_retries = parse_number(MAX_RETRIES_ENV, &value)?;
        }
        if let Some(value) = get(MODEL_ENV) {
            self.completion.model = value;
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject settings that cannot produce a working run.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        self.evidence.validate()?;
        if self.call_timeout.is_zero() {
            return Err(RuntimeError::InvalidConfig {
                key: "call_timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.transport.min_backoff > self.transport.max_backoff {
            return Err(RuntimeError::InvalidConfig {
                key: "transport".to_string(),
                message: "min_backoff exceeds max_backoff".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, RuntimeError> {
    value.parse().map_err(|_| RuntimeError::InvalidConfig {
        key: key.to_string(),
        message: format!("'{}' is not a non-negative integer", value),
    })
}

/// Serde adapter for humantime durations (`"500ms"`, `"1m 30s"`).
pub(crate) mod human_duration {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

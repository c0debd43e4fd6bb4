//! API keys that cannot leak into logs.
//!
//! An [`ApiCredential`] prints as `[REDACTED]` under both `{:?}` and `{}`,
//! is zeroed on drop by `secrecy`, and hands out its value only through
//! [`ApiCredential::expose`], which belongs at the line that sends it:
//!
//! ```ignore
//! let key = ApiCredential::from_env("ANTHROPIC_API_KEY", "Anthropic API key")?;
//! request.header("x-api-key", key.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::ProviderError;

const REDACTED: &str = "[REDACTED]";

/// How a credential reached the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    Programmatic,
}

impl CredentialSource {
    fn as_str(&self) -> &'static str {
        match self {
            CredentialSource::Environment => "environment",
            CredentialSource::Programmatic => "programmatic",
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A provider API key.
pub struct ApiCredential {
    secret: SecretString,
    source: CredentialSource,
    label: &'static str,
}

impl ApiCredential {
    /// Wrap a raw key. `label` names the key in messages, never the value.
    pub fn new(value: impl Into<String>, source: CredentialSource, label: &'static str) -> Self {
        Self {
            secret: SecretString::from(value.into()),
            source,
            label,
        }
    }

    /// Read the key from the process environment.
    pub fn from_env(var: &str, label: &'static str) -> Result<Self, ProviderError> {
        Self::from_lookup(var, label, |key| std::env::var(key).ok())
    }

    /// Read the key through `lookup`. Unset and blank values are both missing.
    pub fn from_lookup<F>(var: &str, label: &'static str, lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = lookup(var)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!("{} missing: set {}", label, var))
            })?;
        Ok(Self::new(value, CredentialSource::Environment, label))
    }

    /// The raw key. Call only where it is written into a request.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn name(&self) -> &'static str {
        self.label
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("label", &self.label)
            .field("source", &self.source)
            .field("secret", &REDACTED)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}", self.label, self.source, REDACTED)
    }
}

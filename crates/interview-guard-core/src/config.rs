//! Tunable thresholds for evidence acceptance.
//!
//! The defaults (8 and 200 normalized characters) are product choices, not
//! correctness requirements, so they can be overridden from the environment
//! or from a deserialized configuration file.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default minimum normalized length of an accepted quotation.
pub const DEFAULT_MIN_EVIDENCE_LENGTH: usize = 8;

/// Default maximum normalized length of an accepted quotation.
pub const DEFAULT_MAX_EVIDENCE_LENGTH: usize = 200;

/// Environment variable overriding [`EvidenceLimits::min_length`].
pub const MIN_LENGTH_ENV: &str = "INTERVIEW_GUARD_EVIDENCE_MIN_LENGTH";

/// Environment variable overriding [`EvidenceLimits::max_length`].
pub const MAX_LENGTH_ENV: &str = "INTERVIEW_GUARD_EVIDENCE_MAX_LENGTH";

/// Errors from loading or validating configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' is not a non-negative integer")]
    NotAnInteger { key: String, value: String },

    #[error("Evidence minimum length must be at least 1")]
    ZeroMinimum,

    #[error("Evidence minimum length {min} exceeds maximum length {max}")]
    InvertedRange { min: usize, max: usize },
}

/// Inclusive bounds on the normalized length of a quotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceLimits {
    /// Shortest accepted quotation, in normalized characters
    pub min_length: usize,

    /// Longest accepted quotation, in normalized characters
    pub max_length: usize,
}

impl Default for EvidenceLimits {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_EVIDENCE_LENGTH,
            max_length: DEFAULT_MAX_EVIDENCE_LENGTH,
        }
    }
}

impl EvidenceLimits {
    /// Create limits, rejecting empty or inverted ranges.
    pub fn new(min_length: usize, max_length: usize) -> Result<Self, ConfigError> {
        let limits = Self {
            min_length,
            max_length,
        };
        limits.validate()?;
        Ok(limits)
    }

    /// Load limits from the environment, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load limits through an arbitrary key lookup.
    ///
    /// Split out from [`EvidenceLimits::from_env`] so tests need not touch
    /// process-global environment state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let min_length = parse_usize(&lookup, MIN_LENGTH_ENV)?.unwrap_or(defaults.min_length);
        let max_length = parse_usize(&lookup, MAX_LENGTH_ENV)?.unwrap_or(defaults.max_length);
        Self::new(min_length, max_length)
    }

    /// Check that the range is non-empty and starts above zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_length == 0 {
            return Err(ConfigError::ZeroMinimum);
        }
        if self.min_length > self.max_length {
            return Err(ConfigError::InvertedRange {
                min: self.min_length,
                max: self.max_length,
            });
        }
        Ok(())
    }
}

fn parse_usize<F>(lookup: &F, key: &str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ConfigError::NotAnInteger {
                key: key.to_string(),
                value: raw,
            }),
    }
}

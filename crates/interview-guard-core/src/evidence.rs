//! Evidence verification against the transcript.
//!
//! A quotation counts as evidence only if, after [`normalize`], it is a
//! substring of the normalized transcript and its normalized length lies
//! within [`EvidenceLimits`]. Matching is exact containment, never fuzzy:
//! formatting noise is tolerated, paraphrase is not.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EvidenceLimits;
use crate::text::normalize;
use crate::types::Transcript;

/// Why a single quotation was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvidenceRejection {
    #[error("quotation is empty")]
    Empty,

    #[error("quotation is {length} characters, below the minimum of {min}")]
    TooShort { length: usize, min: usize },

    #[error("quotation is {length} characters, above the maximum of {max}")]
    TooLong { length: usize, max: usize },

    #[error("quotation does not appear in the transcript")]
    NotFound,
}

/// A non-empty list of quotations, each verified against one transcript.
///
/// Only [`EvidenceValidator::ground`] can build one, which is what lets
/// [`crate::types::ItemState::Answered`] carry the evidence invariant in its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct GroundedEvidence(Vec<String>);

impl GroundedEvidence {
    /// The verified quotations, in the order the model cited them.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Number of verified quotations (always at least one).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; present for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }
}

/// Diagnostic breakdown of a quotation list.
///
/// Never used to decide status; only [`EvidenceValidator::is_valid_set`] does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceQuality {
    pub total: usize,
    pub valid: usize,
    pub empty: usize,
    pub too_short: usize,
    pub too_long: usize,
    pub not_found: usize,
    /// `valid / total`, or 0.0 for an empty list
    pub ratio: f64,
}

/// Verifies quotations against a single transcript.
pub struct EvidenceValidator<'a> {
    normalized_transcript: &'a str,
    limits: EvidenceLimits,
}

impl<'a> EvidenceValidator<'a> {
    /// Create a validator for `transcript`.
    pub fn new(transcript: &'a Transcript, limits: EvidenceLimits) -> Self {
        Self {
            normalized_transcript: transcript.normalized(),
            limits,
        }
    }

    /// Check one quotation, returning its normalized length on success.
    pub fn check(&self, snippet: &str) -> Result<usize, EvidenceRejection> {
        let normalized = normalize(snippet);
        if normalized.is_empty() {
            return Err(EvidenceRejection::Empty);
        }

        let length = normalized.chars().count();
        if length < self.limits.min_length {
            return Err(EvidenceRejection::TooShort {
                length,
                min: self.limits.min_length,
            });
        }
        if length > self.limits.max_length {
            return Err(EvidenceRejection::TooLong {
                length,
                max: self.limits.max_length,
            });
        }

        if !self.normalized_transcript.contains(normalized.as_str()) {
            return Err(EvidenceRejection::NotFound);
        }

        Ok(length)
    }

    /// Whether one quotation is acceptable evidence.
    pub fn is_valid(&self, snippet: &str) -> bool {
        self.check(snippet).is_ok()
    }

    /// Whether a non-empty list contains at least one acceptable quotation.
    pub fn is_valid_set<S: AsRef<str>>(&self, snippets: &[S]) -> bool {
        snippets.iter().any(|s| self.is_valid(s.as_ref()))
    }

    /// Keep only the acceptable quotations, deduplicated by normalized form.
    ///
    /// Returns `None` exactly when [`EvidenceValidator::is_valid_set`] is false.
    pub fn ground<S: AsRef<str>>(&self, snippets: &[S]) -> Option<GroundedEvidence> {
        let mut seen = std::collections::HashSet::new();
        let kept: Vec<String> = snippets
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| self.is_valid(s))
            .filter(|s| seen.insert(normalize(s)))
            .map(|s| s.trim().to_string())
            .collect();

        if kept.is_empty() {
            None
        } else {
            Some(GroundedEvidence(kept))
        }
    }

    /// Count outcomes per rejection kind.
    pub fn quality<S: AsRef<str>>(&self, snippets: &[S]) -> EvidenceQuality {
        let mut quality = EvidenceQuality {
            total: snippets.len(),
            ..Default::default()
        };

        for snippet in snippets {
            match self.check(snippet.as_ref()) {
                Ok(_) => quality.valid += 1,
                Err(EvidenceRejection::Empty) => quality.empty += 1,
                Err(EvidenceRejection::TooShort { .. }) => quality.too_short += 1,
                Err(EvidenceRejection::TooLong { .. }) => quality.too_long += 1,
                Err(EvidenceRejection::NotFound) => quality.not_found += 1,
            }
        }

        if quality.total > 0 {
            quality.ratio = quality.valid as f64 / quality.total as f64;
        }
        quality
    }
}

/// Check one quotation against a raw transcript with default limits.
pub fn is_valid_evidence(snippet: &str, transcript: &str) -> bool {
    let transcript = Transcript::new(transcript);
    EvidenceValidator::new(&transcript, EvidenceLimits::default()).is_valid(snippet)
}

/// Check a quotation list against a raw transcript with default limits.
pub fn is_valid_evidence_set<S: AsRef<str>>(snippets: &[S], transcript: &str) -> bool {
    let transcript = Transcript::new(transcript);
    EvidenceValidator::new(&transcript, EvidenceLimits::default()).is_valid_set(snippets)
}

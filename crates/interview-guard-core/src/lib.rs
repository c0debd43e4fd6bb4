//! # interview-guard-core
//!
//! Deterministic, evidence-gated normalization of model-extracted interview
//! answers.
//!
//! Given N questions, a transcript and a model's raw text output, this crate
//! answers:
//! - Is the output structurally what was asked for?
//! - Which claimed answers are actually backed by the transcript?
//! - What is the safe result to store?
//!
//! ## Key Guarantees
//!
//! 1. **Exact count**: a result always has one item per question, in order
//! 2. **Grounded answers**: an answered item carries only quotations found
//!    verbatim (after [`normalize`]) in the transcript
//! 3. **Deterministic**: same input always produces same output
//! 4. **No model calls**: nothing here does I/O; see `interview-guard-runtime`
//!
//! ## Example
//!
//! ```rust
//! use interview_guard_core::{guard_output, EvidenceLimits, Question, Transcript};
//!
//! let questions = Question::numbered(["Where do you live?", "Any pets?"]);
//! let transcript = Transcript::new("I live in Sapporo with my partner. We moved in 2019.");
//! let raw = r#"Here you go:
//! {"items": [
//!   {"question": "Where do you live?", "answer": "Sapporo", "status": "answered",
//!    "evidence": ["I live in Sapporo"]},
//!   {"question": "Any pets?", "answer": "A cat", "status": "answered",
//!    "evidence": ["We have a cat"]}
//! ]}"#;
//!
//! let checked = guard_output(raw, &questions, &transcript, EvidenceLimits::default());
//! assert!(checked.report.ok);
//! // the second quotation is not in the transcript
//! assert_eq!(checked.outcome.result.answered_count(), 1);
//! ```

pub mod clamp;
pub mod config;
pub mod evidence;
pub mod payload;
pub mod projection;
pub mod sanitize;
pub mod schema;
pub mod text;
pub mod types;

// Re-export main types at crate root
pub use clamp::{ClampOutcome, Clamper, Downgrade, DowngradeReason};
pub use config::{ConfigError, EvidenceLimits};
pub use evidence::{
    is_valid_evidence, is_valid_evidence_set, EvidenceQuality, EvidenceRejection,
    EvidenceValidator, GroundedEvidence,
};
pub use payload::{Candidate, CandidateItem};
pub use projection::{render_legacy, ProjectionOptions};
pub use schema::{SchemaError, SchemaValidator, ValidationReport, Violation};
pub use text::{normalize, normalized_len};
pub use types::{
    AnswerRejection, InterviewItem, InterviewResult, ItemState, ItemStatus, Question,
    Transcript,
};

/// A single raw output taken through the whole deterministic pipeline.
#[derive(Debug, Clone)]
pub struct GuardedOutput {
    /// What could be parsed out of the raw text
    pub candidate: Candidate,

    /// Schema and self-consistency report for the candidate
    pub report: ValidationReport,

    /// The clamped, contract-conforming result
    pub outcome: ClampOutcome,
}

/// Parse, validate and clamp one raw model output.
///
/// This is one pass without repair: the result is always safe to store even
/// when `report.ok` is false.
///
/// # Arguments
///
/// * `raw` - The model's text output, possibly wrapped in prose or fences
/// * `questions` - The ordered questions the output should answer
/// * `transcript` - The only source of truth for evidence
/// * `limits` - Accepted quotation length range
pub fn guard_output(
    raw: &str,
    questions: &[Question],
    transcript: &Transcript,
    limits: EvidenceLimits,
) -> GuardedOutput {
    let candidate = Candidate::parse(raw);
    let report = SchemaValidator::new(limits).validate(candidate.payload.as_ref(), questions.len());
    let outcome = Clamper::new(limits).clamp(&candidate, questions, transcript);

    GuardedOutput {
        candidate,
        report,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_output_unparseable() {
        let questions = Question::numbered(["a", "b"]);
        let transcript = Transcript::new("transcript text that is long enough");
        let guarded = guard_output("no json here", &questions, &transcript, EvidenceLimits::default());

        assert!(!guarded.candidate.has_payload());
        assert!(!guarded.report.ok);
        assert_eq!(guarded.outcome.result.len(), 2);
        assert_eq!(guarded.outcome.padded, 2);
    }

    #[test]
    fn test_guard_output_schema_failure_still_clamps() {
        let questions = Question::numbered(["Where?"]);
        let transcript = Transcript::new("I grew up near the harbour in Kobe.");
        let raw = r#"[{"status": "answered", "answer": "Kobe", "evidence": ["near the harbour in Kobe"]}]"#;
        let guarded = guard_output(raw, &questions, &transcript, EvidenceLimits::default());

        // question field missing
        assert!(!guarded.report.ok);
        assert_eq!(guarded.outcome.result.answered_count(), 1);
        assert_eq!(guarded.outcome.result.items()[0].question(), "Where?");
    }
}

//! JSON reports for the offline subcommands.

use interview_guard_core::{
    guard_output, ClampOutcome, Downgrade, EvidenceLimits, EvidenceQuality, EvidenceValidator,
    GuardedOutput, InterviewResult, Question, SchemaValidator, Transcript, ValidationReport,
};
use serde::Serialize;

/// Result of `check`: one raw output through parse, validate and clamp.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub payload_found: bool,
    pub expected_items: usize,
    pub candidate_items: usize,
    /// Clamping changed nothing: no downgrades, truncation or padding
    pub clamped_cleanly: bool,
    pub report: ValidationReport,
    pub result: InterviewResult,
    pub downgraded: Vec<Downgrade>,
    pub truncated: usize,
    pub padded: usize,
}

impl CheckReport {
    /// Build the report. `expected` overrides the item count the schema
    /// check demands; clamping always follows the question list.
    pub fn build(
        raw: &str,
        questions: &[Question],
        transcript: &Transcript,
        limits: EvidenceLimits,
        expected: Option<usize>,
    ) -> Self {
        let GuardedOutput {
            candidate,
            report,
            outcome,
        } = guard_output(raw, questions, transcript, limits);

        let expected_items = expected.unwrap_or(questions.len());
        let report = if expected_items == questions.len() {
            report
        } else {
            SchemaValidator::new(limits).validate(candidate.payload.as_ref(), expected_items)
        };

        let clamped_cleanly = outcome.is_clean();
        let ClampOutcome {
            result,
            downgrades,
            truncated,
            padded,
        } = outcome;

        Self {
            payload_found: candidate.has_payload(),
            expected_items,
            candidate_items: candidate.items.len(),
            clamped_cleanly,
            report,
            result,
            downgraded: downgrades,
            truncated,
            padded,
        }
    }
}

/// Verdict for one quotation.
#[derive(Debug, Serialize)]
pub struct SnippetVerdict {
    pub snippet: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalized_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
}

/// Result of `evidence`.
#[derive(Debug, Serialize)]
pub struct EvidenceReport {
    pub limits: EvidenceLimits,
    pub snippets: Vec<SnippetVerdict>,
    pub quality: EvidenceQuality,
    /// Whether the list as a whole would support an answer
    pub supports_answer: bool,
}

impl EvidenceReport {
    pub fn build(snippets: &[String], transcript: &Transcript, limits: EvidenceLimits) -> Self {
        let validator = EvidenceValidator::new(transcript, limits);

        let verdicts = snippets
            .iter()
            .map(|snippet| match validator.check(snippet) {
                Ok(length) => SnippetVerdict {
                    snippet: snippet.clone(),
                    valid: true,
                    normalized_length: Some(length),
                    rejection: None,
                },
                Err(rejection) => SnippetVerdict {
                    snippet: snippet.clone(),
                    valid: false,
                    normalized_length: None,
                    rejection: Some(rejection.to_string()),
                },
            })
            .collect();

        Self {
            limits,
            snippets: verdicts,
            quality: validator.quality(snippets),
            supports_answer: validator.is_valid_set(snippets),
        }
    }
}

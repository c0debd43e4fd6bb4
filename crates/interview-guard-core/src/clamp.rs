//! The deterministic last line of defense.
//!
//! Whatever the model produced, [`Clamper::clamp`] returns exactly one item
//! per question, in question order, where every answered item carries only
//! quotations verified against the transcript. It runs on every path out of
//! the orchestrator, including after a schema pass.

use serde::Serialize;

use crate::config::EvidenceLimits;
use crate::evidence::EvidenceValidator;
use crate::payload::{Candidate, CandidateItem};
use crate::types::{AnswerRejection, InterviewItem, InterviewResult, Question, Transcript};

/// Why an item claimed as answered was forced to unanswered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DowngradeReason {
    /// Answer text was missing or blank after sanitizing
    BlankAnswer,

    /// No quotation survived verification against the transcript
    UnverifiedEvidence,
}

impl From<AnswerRejection> for DowngradeReason {
    fn from(rejection: AnswerRejection) -> Self {
        match rejection {
            AnswerRejection::BlankAnswer => DowngradeReason::BlankAnswer,
            AnswerRejection::UnverifiedEvidence => DowngradeReason::UnverifiedEvidence,
        }
    }
}

/// One downgraded item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Downgrade {
    /// 1-based question position
    pub index: usize,
    pub reason: DowngradeReason,
}

/// The clamped result plus what had to be corrected to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClampOutcome {
    pub result: InterviewResult,
    pub downgrades: Vec<Downgrade>,
    /// Candidate items dropped past the question count
    pub truncated: usize,
    /// Positions filled with unanswered because the candidate ran short
    pub padded: usize,
}

impl ClampOutcome {
    /// True if the candidate needed no correction at all.
    pub fn is_clean(&self) -> bool {
        self.downgrades.is_empty() && self.truncated == 0 && self.padded == 0
    }
}

/// Forces a candidate into a contract-conforming [`InterviewResult`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Clamper {
    limits: EvidenceLimits,
}

impl Clamper {
    pub fn new(limits: EvidenceLimits) -> Self {
        Self { limits }
    }

    /// Clamp `candidate` to `questions`, verifying evidence against `transcript`.
    ///
    /// Total: never errors and never panics.
    pub fn clamp(
        &self,
        candidate: &Candidate,
        questions: &[Question],
        transcript: &Transcript,
    ) -> ClampOutcome {
        let validator = EvidenceValidator::new(transcript, self.limits);
        let mut downgrades = Vec::new();

        let items = questions
            .iter()
            .enumerate()
            .map(|(i, question)| match candidate.items.get(i) {
                Some(item) => match clamp_item(item, question, &validator) {
                    Ok(clamped) => clamped,
                    Err(reason) => {
                        downgrades.push(Downgrade {
                            index: question.index,
                            reason,
                        });
                        InterviewItem::unanswered(question.text.clone())
                    }
                },
                None => InterviewItem::unanswered(question.text.clone()),
            })
            .collect();

        ClampOutcome {
            result: InterviewResult::from_items(items),
            downgrades,
            truncated: candidate.items.len().saturating_sub(questions.len()),
            padded: questions.len().saturating_sub(candidate.items.len()),
        }
    }
}

fn clamp_item(
    item: &CandidateItem,
    question: &Question,
    validator: &EvidenceValidator<'_>,
) -> Result<InterviewItem, DowngradeReason> {
    if !item.claims_answered() {
        return Ok(InterviewItem::unanswered(question.text.clone()));
    }

    let answer = item.answer.as_deref().unwrap_or_default();
    InterviewItem::answered(question.text.clone(), answer, &item.evidence, validator)
        .map_err(DowngradeReason::from)
}

/// Clamp with default evidence limits.
pub fn clamp(candidate: &Candidate, questions: &[Question], transcript: &Transcript) -> ClampOutcome {
    Clamper::default().clamp(candidate, questions, transcript)
}

//! Core types for interview extraction.
//!
//! The validated output types ([`InterviewItem`], [`InterviewResult`]) are
//! serializable but deliberately not deserializable: the only way to obtain
//! one is through the evidence check or the [`crate::Clamper`].

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::evidence::{EvidenceValidator, GroundedEvidence};
use crate::sanitize::sanitize_answer;
use crate::text::normalize;

/// A question put to the interviewee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Stable identifier (e.g., "q1")
    pub id: String,

    /// 1-based position in the question list
    pub index: usize,

    /// The prompt text
    pub text: String,
}

impl Question {
    /// Create a question with an explicit identifier.
    pub fn new(id: impl Into<String>, index: usize, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            index,
            text: text.into(),
        }
    }

    /// Build an ordered question list with identifiers `q1..qN`.
    pub fn numbered<I, S>(texts: I) -> Vec<Question>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Question::new(format!("q{}", i + 1), i + 1, text))
            .collect()
    }
}

/// The source transcript for one extraction run.
///
/// Holds the normalized form alongside the raw text so every evidence check
/// in a run compares against the same canonical string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    raw: String,
    normalized: String,
}

impl Transcript {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize(&raw);
        Self { raw, normalized }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// True if nothing survives normalization.
    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

/// Answer status as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Answered,
    Unanswered,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Answered => "answered",
            ItemStatus::Unanswered => "unanswered",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two exhaustive states of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemState {
    /// Backed by at least one verified quotation
    Answered {
        answer: String,
        evidence: GroundedEvidence,
    },

    /// No verified support; carries no answer and no evidence
    Unanswered,
}

/// Why an answered item could not be constructed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerRejection {
    #[error("answer text is blank")]
    BlankAnswer,

    #[error("no quotation could be verified against the transcript")]
    UnverifiedEvidence,
}

/// One question and its evidence-gated answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterviewItem {
    question: String,
    state: ItemState,
}

impl InterviewItem {
    /// Build an answered item, verifying `evidence` against the validator's transcript.
    ///
    /// The answer text is sanitized first; quotations that fail verification
    /// are dropped, and if none remain the item cannot be answered.
    pub fn answered<S: AsRef<str>>(
        question: impl Into<String>,
        answer: &str,
        evidence: &[S],
        validator: &EvidenceValidator<'_>,
    ) -> Result<Self, AnswerRejection> {
        let answer = sanitize_answer(answer);
        if answer.is_empty() {
            return Err(AnswerRejection::BlankAnswer);
        }
        let evidence = validator
            .ground(evidence)
            .ok_or(AnswerRejection::UnverifiedEvidence)?;

        Ok(Self {
            question: question.into(),
            state: ItemState::Answered { answer, evidence },
        })
    }

    /// Build an unanswered item.
    pub fn unanswered(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            state: ItemState::Unanswered,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn status(&self) -> ItemStatus {
        match self.state {
            ItemState::Answered { .. } => ItemStatus::Answered,
            ItemState::Unanswered => ItemStatus::Unanswered,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self.state, ItemState::Answered { .. })
    }

    pub fn answer(&self) -> Option<&str> {
        match &self.state {
            ItemState::Answered { answer, .. } => Some(answer),
            ItemState::Unanswered => None,
        }
    }

    /// Verified quotations; empty for unanswered items.
    pub fn evidence(&self) -> &[String] {
        match &self.state {
            ItemState::Answered { evidence, .. } => evidence.as_slice(),
            ItemState::Unanswered => &[],
        }
    }
}

#[derive(Serialize)]
struct ItemWire<'a> {
    question: &'a str,
    answer: Option<&'a str>,
    status: ItemStatus,
    evidence: &'a [String],
}

impl Serialize for InterviewItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ItemWire {
            question: &self.question,
            answer: self.answer(),
            status: self.status(),
            evidence: self.evidence(),
        }
        .serialize(serializer)
    }
}

/// Exactly one item per question, in question order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterviewResult {
    items: Vec<InterviewItem>,
}

impl InterviewResult {
    pub(crate) fn from_items(items: Vec<InterviewItem>) -> Self {
        Self { items }
    }

    /// The safe default: every question unanswered.
    pub fn all_unanswered(questions: &[Question]) -> Self {
        Self {
            items: questions
                .iter()
                .map(|q| InterviewItem::unanswered(q.text.clone()))
                .collect(),
        }
    }

    pub fn items(&self) -> &[InterviewItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn answered_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_answered()).count()
    }
}

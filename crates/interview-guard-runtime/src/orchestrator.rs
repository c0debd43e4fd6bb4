//! The bounded repair loop around a model call.
//!
//! One run moves through
//! `Init -> AwaitingModel -> Validating -> {Done | Repairing -> AwaitingModel}`
//! and always ends in the Clamper, so the returned result satisfies the
//! count and evidence invariants whatever the model did. Transport retries
//! happen inside a single `AwaitingModel` step and are counted separately
//! from repair attempts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use interview_guard_core::sanitize::looks_like_injection;
use interview_guard_core::{
    Candidate, Clamper, Downgrade, InterviewResult, Question, SchemaValidator, Transcript,
    Violation,
};

use crate::config::RuntimeConfig;
use crate::prompts;
use crate::providers::{ChatMessage, LlmProvider, LlmUsage};
use crate::resilience::complete_with_retry;
use crate::RuntimeError;

/// One rejected output and why, handed to the repair prompt.
#[derive(Debug, Clone)]
pub struct RepairAttempt {
    /// 1-based repair number
    pub attempt_number: u32,

    /// The raw text the model returned (empty after a transport failure)
    pub raw_output: String,

    pub violations: Vec<Violation>,
}

/// How a run went.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionMetadata {
    /// Logical model calls (primary plus repairs)
    pub model_call_count: u32,

    /// Physical transport attempts across all logical calls
    pub transport_attempts: u32,

    pub repair_attempted: bool,

    /// Whether the final candidate passed schema validation
    pub validation_passed: bool,

    /// Why the final candidate is not a clean model answer, if it is not.
    ///
    /// Holds the latest call's transport error or the final validation
    /// failure. A later call that returns a response clears it.
    pub last_error: Option<String>,

    /// Items the Clamper forced to unanswered
    pub downgraded: Vec<Downgrade>,

    /// Candidate items dropped past the question count
    pub truncated: usize,

    /// Positions padded with unanswered
    pub padded: usize,

    /// Token usage over all successful calls
    pub usage: LlmUsage,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// The result of one run plus its metadata.
///
/// `validation_passed: false` with an all-unanswered result is an ordinary
/// outcome, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub result: InterviewResult,
    pub metadata: ExtractionMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    AwaitingModel,
    Validating,
    Repairing,
    Done,
}

/// Drives the model through extraction and repair.
///
/// Holds no per-run state, so one instance behind an `Arc` can serve
/// concurrent runs.
pub struct RepairOrchestrator {
    provider: Arc<dyn LlmProvider>,
    config: RuntimeConfig,
}

impl RepairOrchestrator {
    /// Create an orchestrator. Use [`RepairOrchestratorBuilder`] to have the
    /// configuration validated.
    pub fn new(provider: Arc<dyn LlmProvider>, config: RuntimeConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run an extraction for plain question texts, numbered `q1..qN`.
    pub async fn extract_texts<S: AsRef<str>>(&self, questions: &[S], transcript: &str) -> Extraction {
        let questions = Question::numbered(questions.iter().map(|q| q.as_ref().to_string()));
        self.extract(&questions, transcript).await
    }

    /// Run one extraction. Never fails; see [`ExtractionMetadata`] for what happened.
    pub async fn extract(&self, questions: &[Question], transcript: &str) -> Extraction {
        let started_at = Utc::now();
        let transcript = Transcript::new(transcript);
        let limits = self.config.evidence;
        let schema = SchemaValidator::new(limits);

        let mut metadata = ExtractionMetadata {
            model_call_count: 0,
            transport_attempts: 0,
            repair_attempted: false,
            validation_passed: false,
            last_error: None,
            downgraded: Vec::new(),
            truncated: 0,
            padded: 0,
            usage: LlmUsage::default(),
            started_at,
            completed_at: started_at,
        };

        if questions.is_empty() {
            tracing::debug!("No questions, skipping model call");
            metadata.validation_passed = true;
            metadata.completed_at = Utc::now();
            return Extraction {
                result: InterviewResult::all_unanswered(questions),
                metadata,
            };
        }

        if looks_like_injection(transcript.raw()) {
            tracing::warn!("Transcript contains instruction-like phrasing");
        }

        let mut phase = Phase::Init;
        let mut messages: Vec<ChatMessage> = Vec::new();
        let mut raw_output = String::new();
        let mut candidate = Candidate::empty();
        let mut violations: Vec<Violation> = Vec::new();
        let mut repairs_used: u32 = 0;

        loop {
            phase = match phase {
                Phase::Init => {
                    messages = prompts::primary_messages(questions, &transcript, limits);
                    Phase::AwaitingModel
                }

                Phase::AwaitingModel => {
                    metadata.model_call_count += 1;
                    tracing::info!(
                        provider = self.provider.name(),
                        call = metadata.model_call_count,
                        questions = questions.len(),
                        "Requesting extraction"
                    );

                    let outcome = complete_with_retry(
                        self.provider.as_ref(),
                        &messages,
                        &self.config.completion,
                        &self.config.transport,
                        self.config.call_timeout,
                    )
                    .await;
                    metadata.transport_attempts += outcome.attempts;

                    raw_output = match outcome.response {
                        Ok(response) => {
                            metadata.usage.add(&response.usage);
                            metadata.last_error = None;
                            response.content
                        }
                        Err(e) => {
                            tracing::warn!(
                                error = %e,
                                attempts = outcome.attempts,
                                "Model call failed, treating output as empty"
                            );
                            metadata.last_error = Some(e.to_string());
                            String::new()
                        }
                    };
                    candidate = Candidate::parse(&raw_output);
                    Phase::Validating
                }

                Phase::Validating => {
                    let report = schema.validate(candidate.payload.as_ref(), questions.len());
                    if report.ok {
                        metadata.validation_passed = true;
                        Phase::Done
                    } else {
                        tracing::info!(
                            violations = report.violations.len(),
                            details = ?report.messages(),
                            "Candidate failed validation"
                        );
                        violations = report.violations;
                        if repairs_used < self.config.max_repair_attempts {
                            Phase::Repairing
                        } else {
                            tracing::warn!(
                                repairs = repairs_used,
                                "Repair budget exhausted, clamping last candidate"
                            );
                            metadata.last_error = Some(format!(
                                "validation failed: {}",
                                report_summary(&violations)
                            ));
                            Phase::Done
                        }
                    }
                }

                Phase::Repairing => {
                    repairs_used += 1;
                    metadata.repair_attempted = true;
                    let attempt = RepairAttempt {
                        attempt_number: repairs_used,
                        raw_output: std::mem::take(&mut raw_output),
                        violations: std::mem::take(&mut violations),
                    };
                    messages = prompts::repair_messages(questions, &transcript, limits, &attempt);
                    Phase::AwaitingModel
                }

                Phase::Done => break,
            };
        }

        let outcome = Clamper::new(limits).clamp(&candidate, questions, &transcript);
        for downgrade in &outcome.downgrades {
            tracing::info!(
                item = downgrade.index,
                reason = ?downgrade.reason,
                "Answer downgraded to unanswered"
            );
        }
        if outcome.truncated > 0 || outcome.padded > 0 {
            tracing::info!(
                truncated = outcome.truncated,
                padded = outcome.padded,
                "Item count corrected"
            );
        }

        metadata.downgraded = outcome.downgrades;
        metadata.truncated = outcome.truncated;
        metadata.padded = outcome.padded;
        metadata.completed_at = Utc::now();

        tracing::info!(
            answered = outcome.result.answered_count(),
            questions = questions.len(),
            calls = metadata.model_call_count,
            validation_passed = metadata.validation_passed,
            "Extraction finished"
        );

        Extraction {
            result: outcome.result,
            metadata,
        }
    }
}

fn report_summary(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Builder for [`RepairOrchestrator`].
pub struct RepairOrchestratorBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    config: RuntimeConfig,
}

impl RepairOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            config: RuntimeConfig::default(),
        }
    }

    /// Set the model provider.
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the orchestrator, validating the configuration.
    pub fn build(self) -> Result<RepairOrchestrator, RuntimeError> {
        let provider = self
            .provider
            .ok_or_else(|| RuntimeError::ProviderNotConfigured("No provider set".to_string()))?;
        self.config.validate()?;
        Ok(RepairOrchestrator::new(provider, self.config))
    }
}

impl Default for RepairOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! interview-guard CLI
//!
//! Evidence-gated extraction of interview answers from a transcript.
//!
//! ## Commands
//!
//! - `extract`: run the full repair loop against a provider or replayed outputs
//! - `check`: parse, validate and clamp one saved model output offline
//! - `evidence`: explain whether quotations would count as evidence
//!
//! Results go to stdout as JSON; logs go to stderr (`RUST_LOG`, default `info`).

mod input;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use interview_guard_core::{render_legacy, EvidenceLimits, ProjectionOptions, Transcript};
use interview_guard_runtime::providers::ScriptedProvider;
use interview_guard_runtime::{LlmProvider, RepairOrchestratorBuilder, RuntimeConfig};

use crate::report::{CheckReport, EvidenceReport};

#[derive(Parser)]
#[command(name = "interview-guard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract interview answers that are backed by the transcript", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an extraction with validation, repair and clamping
    Extract {
        /// Questions file (YAML or JSON list)
        #[arg(short, long)]
        questions: PathBuf,

        /// Transcript text file
        #[arg(short, long)]
        transcript: PathBuf,

        /// Replay a recorded model output instead of calling a provider (repeat for repairs)
        #[arg(long)]
        replay: Vec<PathBuf>,

        /// Model provider for live runs
        #[arg(long, value_enum, default_value = "anthropic")]
        provider: ProviderKind,

        /// Runtime configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Answer text shown for unanswered items in legacy output
        #[arg(long)]
        placeholder: Option<String>,
    },

    /// Validate and clamp a saved model output without calling a model
    Check {
        /// Questions file (YAML or JSON list)
        #[arg(short, long)]
        questions: PathBuf,

        /// Transcript text file
        #[arg(short, long)]
        transcript: PathBuf,

        /// File holding the raw model output
        #[arg(short, long)]
        output: PathBuf,

        /// Item count the output must have (default: number of questions)
        #[arg(long)]
        expected: Option<usize>,
    },

    /// Check quotations against a transcript
    Evidence {
        /// Transcript text file
        #[arg(short, long)]
        transcript: PathBuf,

        /// Quotations to check
        #[arg(required = true)]
        snippets: Vec<String>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProviderKind {
    Anthropic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Full extraction with metadata
    Json,
    /// Plain question/answer/status blocks
    Legacy,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Extract {
            questions,
            transcript,
            replay,
            provider,
            config,
            format,
            placeholder,
        } => {
            let questions = input::load_questions(&questions)?;
            let transcript = input::read_text(&transcript)?;

            let config = match config {
                Some(path) => RuntimeConfig::from_yaml_file(&path)?.with_env()?,
                None => RuntimeConfig::from_env()?,
            };
            let provider = build_provider(&replay, provider, &config)?;

            let orchestrator = RepairOrchestratorBuilder::new()
                .provider(provider)
                .config(config)
                .build()?;
            let extraction = orchestrator.extract(&questions, &transcript).await;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&extraction)?),
                OutputFormat::Legacy => {
                    let mut options = ProjectionOptions::default();
                    if let Some(placeholder) = placeholder {
                        options.placeholder = placeholder;
                    }
                    println!("{}", render_legacy(&extraction.result, &options));
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Check {
            questions,
            transcript,
            output,
            expected,
        } => {
            let questions = input::load_questions(&questions)?;
            let transcript = Transcript::new(input::read_text(&transcript)?);
            let raw = input::read_text(&output)?;
            let limits = EvidenceLimits::from_env()?;

            let report = CheckReport::build(&raw, &questions, &transcript, limits, expected);
            println!("{}", serde_json::to_string_pretty(&report)?);

            Ok(if report.report.ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::Evidence {
            transcript,
            snippets,
        } => {
            let transcript = Transcript::new(input::read_text(&transcript)?);
            let limits = EvidenceLimits::from_env()?;

            let report = EvidenceReport::build(&snippets, &transcript, limits);
            println!("{}", serde_json::to_string_pretty(&report)?);

            Ok(if report.supports_answer {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// Replayed outputs take precedence over a live provider.
fn build_provider(
    replay: &[PathBuf],
    kind: ProviderKind,
    config: &RuntimeConfig,
) -> Result<Arc<dyn LlmProvider>> {
    if !replay.is_empty() {
        let outputs = replay
            .iter()
            .map(|path| input::read_text(path))
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(outputs = outputs.len(), "Replaying recorded model outputs");
        return Ok(Arc::new(ScriptedProvider::from_outputs(outputs)));
    }

    match kind {
        ProviderKind::Anthropic => anthropic_provider(config),
    }
}

#[cfg(feature = "anthropic")]
fn anthropic_provider(config: &RuntimeConfig) -> Result<Arc<dyn LlmProvider>> {
    use anyhow::Context;
    use interview_guard_runtime::providers::AnthropicProvider;

    let mut provider = AnthropicProvider::from_env().context("Cannot start Anthropic provider")?;
    if let Some(url) = &config.base_url {
        provider = provider.with_base_url(url.clone());
    }
    Ok(Arc::new(provider))
}

#[cfg(not(feature = "anthropic"))]
fn anthropic_provider(_config: &RuntimeConfig) -> Result<Arc<dyn LlmProvider>> {
    anyhow::bail!("built without the `anthropic` feature; rebuild with it or pass --replay")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_extract_accepts_repeated_replay() {
        let cli = Cli::try_parse_from([
            "interview-guard",
            "extract",
            "-q",
            "questions.yaml",
            "-t",
            "transcript.txt",
            "--replay",
            "first.txt",
            "--replay",
            "second.txt",
            "--format",
            "legacy",
        ])
        .unwrap();

        match cli.command {
            Commands::Extract { replay, format, .. } => {
                assert_eq!(replay.len(), 2);
                assert_eq!(format, OutputFormat::Legacy);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_evidence_requires_snippets() {
        assert!(Cli::try_parse_from(["interview-guard", "evidence", "-t", "t.txt"]).is_err());
    }

    #[test]
    fn test_replay_builds_scripted_provider() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        std::fs::write(&path, "{\"items\": []}").unwrap();

        let provider =
            build_provider(&[path], ProviderKind::Anthropic, &RuntimeConfig::default()).unwrap();
        assert_eq!(provider.name(), "scripted");
    }

    #[test]
    fn test_missing_replay_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.txt");

        let result = build_provider(&[missing], ProviderKind::Anthropic, &RuntimeConfig::default());
        assert!(result.is_err());
    }
}

//! Resilience patterns for interview-guard-runtime.
//!
//! Transport-level only: per-attempt timeout plus exponential backoff on
//! transient provider errors. Content-level recovery (the repair prompt)
//! lives in the orchestrator and is budgeted separately.

mod retry;

pub use retry::{complete_with_retry, TransportOutcome, TransportRetryConfig};

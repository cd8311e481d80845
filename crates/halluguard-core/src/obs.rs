//! Structured observability hooks for validation run lifecycle events.
//!
//! This module provides:
//! - Run- and entry-scoped tracing spans for instrumenting async work
//! - Emission functions for key lifecycle events: run start, attempt
//!   recorded, entry finalized, run finished, run cancelled
//!
//! Events are emitted at `info!` level, client failures and cancellation at
//! `warn!`. Verbosity follows `RUST_LOG`.

use tracing::{info, warn, Span};

use crate::domain::{Classification, RunStats, Verdict};

/// Run-scoped span. Attach with `Instrument::instrument` so every event
/// emitted while the run future executes carries `run_id`.
///
/// # Example
///
/// ```ignore
/// drive_run(kb, client).instrument(run_span("0f8c...")).await
/// ```
pub fn run_span(run_id: &str) -> Span {
    tracing::info_span!("halluguard.run", run_id = %run_id)
}

/// Entry-scoped span, nested under the run span.
pub fn entry_span(entry_id: &str) -> Span {
    tracing::info_span!("halluguard.entry", entry_id = %entry_id)
}

/// Emit event: run started.
pub fn emit_run_started(run_id: &str, model: &str, entries: usize, max_retries: u32) {
    info!(
        event = "run.started",
        run_id = %run_id,
        model = %model,
        entries = entries,
        max_retries = max_retries,
    );
}

/// Emit event: one attempt recorded with its verdict.
pub fn emit_attempt_recorded(entry_id: &str, attempt: u32, verdict: Verdict, overlap: f32) {
    info!(
        event = "attempt.recorded",
        entry_id = %entry_id,
        attempt = attempt,
        verdict = %verdict,
        overlap = overlap,
    );
}

/// Emit event: model call failed for an attempt (warning level).
pub fn emit_attempt_failed(entry_id: &str, attempt: u32, error: &dyn std::fmt::Display) {
    warn!(
        event = "attempt.failed",
        entry_id = %entry_id,
        attempt = attempt,
        error = %error,
    );
}

/// Emit event: entry finalized.
pub fn emit_entry_finalized(entry_id: &str, classification: Classification, attempts: u32) {
    info!(
        event = "entry.finalized",
        entry_id = %entry_id,
        classification = %classification,
        attempts = attempts,
    );
}

/// Emit event: run finished with aggregate counts.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, stats: &RunStats) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        total = stats.total,
        correct = stats.correct,
        hallucinations = stats.hallucinations,
        unverifiable = stats.unverifiable,
        accuracy = stats.accuracy(),
    );
}

/// Emit event: run cancelled between entries (warning level).
pub fn emit_run_cancelled(run_id: &str, completed: usize) {
    warn!(event = "run.cancelled", run_id = %run_id, completed = completed);
}

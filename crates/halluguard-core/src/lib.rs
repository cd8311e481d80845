//! Halluguard Core Library
//!
//! Validates model answers against a curated knowledge base, re-asks with a
//! corrective prompt when an answer contradicts the canonical one, and
//! reports per-entry classifications with aggregate statistics.

pub mod classifier;
pub mod client;
pub mod config;
pub mod domain;
pub mod knowledge_base;
pub mod matcher;
pub mod metrics;
pub mod obs;
pub mod recorded;
pub mod recording;
pub mod reporting;
pub mod retry;
pub mod run;
pub mod telemetry;

pub use domain::{
    Attempt, AttemptOutcome, Classification, ClientError, ConfigError, Domain, GuardError,
    KbEntry, Result, RunStats, ValidationReport, ValidationResult, Verdict,
};

pub use classifier::{classify, classify_outcome};
pub use client::{ModelClient, Prompt, PromptKind};
pub use config::RunConfig;
pub use knowledge_base::{KbRecord, KnowledgeBase, RecordId, DEFAULT_EDGE_CASES};
pub use matcher::{normalize, Assessment, Matcher, MatcherConfig};
pub use recorded::{RecordedClient, ResponseRow};
pub use recording::RecordingClient;
pub use reporting::{
    read_report_artifact, render_result_lines, render_summary, write_report_artifact,
    JsonArtifactSink, ResultSink,
};
pub use retry::{run_entry, RetryController, RetryPolicy};
pub use run::{cancel_pair, execute, CancelHandle, CancelSignal, ValidationRun};
pub use telemetry::{init_tracing, LogFormat};

/// Crate version, for report headers and `--version` output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

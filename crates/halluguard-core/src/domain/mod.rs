//! Domain models for Halluguard.
//!
//! Canonical definitions for the core entities:
//! - `KbEntry`: Immutable fact from the knowledge base
//! - `Attempt`: One model call and its outcome
//! - `Verdict` / `Classification`: Matcher output and final category
//! - `ValidationResult` / `ValidationReport`: Per-entry and per-run outcomes

pub mod attempt;
pub mod entry;
pub mod error;
pub mod outcome;
pub mod report;

// Re-export main types and errors
pub use attempt::{Attempt, AttemptOutcome};
pub use entry::{Domain, KbEntry};
pub use error::{ClientError, ConfigError, GuardError, Result};
pub use outcome::{Classification, Verdict};
pub use report::{RunStats, ValidationReport, ValidationResult};

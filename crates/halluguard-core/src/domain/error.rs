//! Domain-level error taxonomy for Halluguard.

use std::path::PathBuf;

/// Errors that make a run impossible to start.
///
/// Raised while loading the knowledge base or assembling the run
/// configuration. A `ConfigError` always aborts before any entry is processed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("knowledge base source not found: {}", path.display())]
    MissingSource { path: PathBuf },

    #[error("malformed knowledge base: {reason}")]
    Malformed { reason: String },

    #[error("duplicate knowledge base id: {id}")]
    DuplicateId { id: String },

    #[error("entry {id}: unknown domain tag '{tag}' (expected factual or edge_case)")]
    UnknownDomain { id: String, tag: String },

    #[error("entry {id}: question must not be empty")]
    EmptyQuestion { id: String },

    #[error("entry {id}: factual entries require an answer with at least one letter or digit")]
    EmptyAnswer { id: String },

    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    #[error("invalid configuration value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Failure of a single model call.
///
/// The retry controller treats every variant the same way: the attempt is
/// consumed without a verdict.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    #[error("authentication failed for {provider}")]
    Auth { provider: String },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("network failure: {0}")]
    Network(String),

    #[error("model call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ClientError {
    /// Whether a client may retry this failure internally before giving up.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Network(_) | Self::Timeout { .. }
        )
    }
}

/// Halluguard crate-level errors.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("run cancelled after {completed} completed entries")]
    Cancelled { completed: usize },

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Halluguard operations.
pub type Result<T> = std::result::Result<T, GuardError>;

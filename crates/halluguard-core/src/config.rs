//! Run configuration.
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML
//! file, environment variables, then explicit overrides from the caller
//! (usually CLI flags).
//!
//! Recognised environment variables:
//! - `OPENAI_API_KEY`
//! - `HALLUGUARD_MODEL`
//! - `HALLUGUARD_API_BASE`
//! - `HALLUGUARD_MAX_RETRIES`
//! - `HALLUGUARD_TIMEOUT_MS`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::ConfigError;
use crate::knowledge_base::KnowledgeBase;
use crate::matcher::MatcherConfig;
use crate::retry::RetryPolicy;

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_OUTPUT_DIR: &str = ".halluguard/runs";

/// Everything a validation run needs to start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Extra attempts per factual entry after the first.
    pub max_retries: u32,

    /// Knowledge base JSON file.
    pub kb_source: Option<PathBuf>,

    /// Model identity sent to the provider.
    pub model: String,

    /// Per-request deadline for the HTTP client.
    pub timeout_ms: u64,

    /// Retries the HTTP client performs on transient failures before
    /// reporting a `ClientError`.
    pub max_internal_retries: u32,

    pub api_base: String,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Directory receiving report artifacts.
    pub output_dir: PathBuf,

    /// Append the bundled edge-case questions to the knowledge base.
    pub include_default_edge_cases: bool,

    pub matcher: MatcherConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            kb_source: None,
            model: DEFAULT_MODEL.to_string(),
            timeout_ms: 30_000,
            max_internal_retries: 2,
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            include_default_edge_cases: false,
            matcher: MatcherConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Malformed {
            reason: format!("run config: {e}"),
        })
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::MissingSource {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Malformed {
            reason: format!("read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Overlay values from the process environment.
    pub fn with_process_env(self) -> Result<Self, ConfigError> {
        self.with_env(|key| std::env::var(key).ok())
    }

    /// Overlay values from an environment lookup.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(model) = non_empty("HALLUGUARD_MODEL") {
            self.model = model;
        }
        if let Some(base) = non_empty("HALLUGUARD_API_BASE") {
            self.api_base = base;
        }
        if let Some(raw) = non_empty("HALLUGUARD_MAX_RETRIES") {
            self.max_retries = parse_number("HALLUGUARD_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = non_empty("HALLUGUARD_TIMEOUT_MS") {
            self.timeout_ms = parse_number("HALLUGUARD_TIMEOUT_MS", &raw)?;
        }
        Ok(self)
    }

    /// Check ranges, and credentials when a live model will be queried.
    pub fn validate(&self, require_credentials: bool) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "model".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        self.matcher.validate()?;
        if require_credentials && self.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(ConfigError::MissingCredentials(
                "OPENAI_API_KEY is not set (environment or .env)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn kb_path(&self) -> Result<&Path, ConfigError> {
        self.kb_source
            .as_deref()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "kb_source".to_string(),
                reason: "no knowledge base file configured".to_string(),
            })
    }

    /// Load the configured knowledge base, with bundled edge cases if enabled.
    pub fn load_knowledge_base(&self) -> Result<KnowledgeBase, ConfigError> {
        let kb = KnowledgeBase::load(self.kb_path()?)?;
        if self.include_default_edge_cases {
            kb.with_default_edge_cases()
        } else {
            Ok(kb)
        }
    }

    /// Retry policy whose outer deadline covers every internal client retry.
    pub fn retry_policy(&self) -> RetryPolicy {
        let per_call = Duration::from_millis(self.timeout_ms);
        let outer = per_call.saturating_mul(self.max_internal_retries.saturating_add(2));
        RetryPolicy::with_max_retries(self.max_retries).with_call_timeout(outer)
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("'{raw}' is not a valid number"),
    })
}

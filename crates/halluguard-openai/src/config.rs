//! Client settings derived from a [`RunConfig`].

use std::time::Duration;

use halluguard_core::config::DEFAULT_API_BASE;
use halluguard_core::{ConfigError, RunConfig};

/// Sampling temperature for every request. Kept low so repeated runs are
/// comparable.
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

#[derive(Clone, PartialEq)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Transient-failure retries before giving up on one `ask`.
    pub max_internal_retries: u32,
    /// Base delay of the linear backoff between internal retries.
    pub backoff: Duration,
    pub temperature: f32,
}

// Hand-written so the API key never reaches a log line.
impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("timeout", &self.timeout)
            .field("max_internal_retries", &self.max_internal_retries)
            .field("backoff", &self.backoff)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
            max_internal_retries: 2,
            backoff: Duration::from_millis(500),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_internal_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.max_internal_retries = retries;
        self.backoff = backoff;
        self
    }

    /// Build from a validated run configuration. Fails without an API key.
    pub fn from_run_config(cfg: &RunConfig) -> Result<Self, ConfigError> {
        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::MissingCredentials(
                    "OPENAI_API_KEY is not set (environment or .env)".to_string(),
                )
            })?;

        Ok(Self {
            api_key,
            model: cfg.model.clone(),
            api_base: cfg.api_base.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(cfg.timeout_ms),
            max_internal_retries: cfg.max_internal_retries,
            ..Self::new("", "")
        })
    }

    pub(crate) fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

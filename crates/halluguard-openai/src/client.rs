//! HTTP transport and the internal retry loop.

use std::time::Duration;

use async_trait::async_trait;
use halluguard_core::{ClientError, ConfigError, ModelClient, Prompt};
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::OpenAiConfig;
use crate::wire::{map_http_error, parse_answer, ChatRequest};

/// One failed request, and whether sending it again could help.
#[derive(Debug)]
struct Failure {
    error: ClientError,
    retriable: bool,
}

impl Failure {
    fn from_error(error: ClientError) -> Self {
        let retriable = error.is_transient();
        Self { error, retriable }
    }

    fn terminal(error: ClientError) -> Self {
        Self {
            error,
            retriable: false,
        }
    }
}

/// Chat completions client for OpenAI and compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "http_client".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    async fn send_once(&self, prompt: &Prompt) -> Result<String, Failure> {
        let url = self.config.completions_url();
        let body = ChatRequest::for_prompt(&self.config.model, prompt, self.config.temperature);
        debug!(url = %url, model = %self.config.model, kind = ?prompt.kind, "sending completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Failure::from_error(self.transport_error(e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Failure::from_error(self.transport_error(e)))?;

        if !status.is_success() {
            let error = map_http_error(status, &text);
            // Client errors other than 429 will fail the same way again.
            if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(Failure::terminal(error));
            }
            return Err(Failure::from_error(error));
        }

        parse_answer(&text).map_err(Failure::terminal)
    }

    fn transport_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::Timeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            ClientError::Network(err.to_string())
        }
    }

    fn delay_before(&self, retry: u32, error: &ClientError) -> Duration {
        match error {
            ClientError::RateLimited { retry_after_secs } => {
                Duration::from_secs(*retry_after_secs).max(self.config.backoff)
            }
            _ => self.config.backoff.saturating_mul(retry),
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn ask(&self, prompt: &Prompt) -> Result<String, ClientError> {
        let mut retry = 0u32;
        loop {
            match self.send_once(prompt).await {
                Ok(answer) => return Ok(answer),
                Err(failure) if failure.retriable && retry < self.config.max_internal_retries => {
                    retry += 1;
                    let delay = self.delay_before(retry, &failure.error);
                    warn!(
                        error = %failure.error,
                        retry = retry,
                        max = self.config.max_internal_retries,
                        delay_ms = delay.as_millis() as u64,
                        "transient model call failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }

    fn identity(&self) -> &str {
        &self.config.model
    }
}

//! Chat completion request and response bodies, and HTTP error mapping.

use std::time::Duration;

use halluguard_core::{ClientError, Prompt, PromptKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const INITIAL_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer questions directly and concisely.";
pub const FOLLOW_UP_SYSTEM_PROMPT: &str =
    "You are a careful assistant that prioritizes accuracy over speculation.";

/// Rate-limit delay used when the provider does not say how long to wait.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub stream: bool,
}

impl ChatRequest {
    pub fn for_prompt(model: &str, prompt: &Prompt, temperature: f32) -> Self {
        let system = match prompt.kind {
            PromptKind::Initial => INITIAL_SYSTEM_PROMPT,
            PromptKind::FollowUp => FOLLOW_UP_SYSTEM_PROMPT,
        };
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt.text.clone(),
                },
            ],
            temperature,
            stream: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the trimmed answer text of the first choice.
pub fn parse_answer(body: &str) -> Result<String, ClientError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ClientError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let content = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::MalformedResponse("no choices in response".to_string()))?
        .message
        .content
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        return Err(ClientError::MalformedResponse(
            "empty message content".to_string(),
        ));
    }
    Ok(content)
}

/// Map a non-success HTTP status to a [`ClientError`].
pub fn map_http_error(status: reqwest::StatusCode, body: &str) -> ClientError {
    match status.as_u16() {
        401 | 403 => {
            debug!(status = status.as_u16(), body = %body, "authentication failed");
            ClientError::Auth {
                provider: "openai".to_string(),
            }
        }
        429 => ClientError::RateLimited {
            retry_after_secs: retry_after_from_body(body).unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        },
        code if code >= 500 => ClientError::Network(format!("server error ({code}): {body}")),
        code => ClientError::Network(format!("HTTP {code}: {body}")),
    }
}

/// Pull the wait out of an error message like "... Please try again in 1.5s."
/// and round it up to whole seconds.
fn retry_after_from_body(body: &str) -> Option<u64> {
    let message = serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")?
        .get("message")?
        .as_str()?
        .to_string();
    let (_, tail) = message.rsplit_once("try again in ")?;
    let wait = parse_wait(tail)?;
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    Some(secs)
}

/// Parse a duration such as `20ms`, `1.5s` or `6m0s` from the start of `text`.
/// A bare number is taken as seconds.
fn parse_wait(text: &str) -> Option<Duration> {
    let mut rest = text.trim_start();
    let mut total = Duration::ZERO;
    let mut parsed_any = false;

    loop {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            break;
        }
        let Ok(value) = rest[..number_len].parse::<f64>() else {
            break;
        };
        rest = &rest[number_len..];

        let (unit_secs, unit_len) = if rest.starts_with("ms") {
            (0.001, 2)
        } else if rest.starts_with('s') {
            (1.0, 1)
        } else if rest.starts_with('m') {
            (60.0, 1)
        } else if rest.starts_with('h') {
            (3600.0, 1)
        } else {
            (1.0, 0)
        };
        rest = &rest[unit_len..];

        let nanos = (value * unit_secs * 1e9).round();
        if !nanos.is_finite() {
            return None;
        }
        total = total.saturating_add(Duration::from_nanos(nanos as u64));
        parsed_any = true;
        if unit_len == 0 {
            break;
        }
    }

    parsed_any.then_some(total)
}

//! Bounded per-entry retry state machine.
//!
//! ```text
//! Init -> AwaitingResponse -> Evaluating -> Retry -> AwaitingResponse ...
//!                                       \-> Done
//! ```
//!
//! Every pass through `Evaluating` appends exactly one [`Attempt`]. `Retry`
//! is taken only when the attempt classified as a hallucination and the
//! attempt budget (`max_retries + 1`) is not yet spent. A failed model call
//! consumes an attempt without a verdict.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, Instrument};

use crate::classifier::classify_outcome;
use crate::client::{ModelClient, Prompt};
use crate::domain::{
    Attempt, AttemptOutcome, Classification, ClientError, KbEntry, ValidationResult, Verdict,
};
use crate::matcher::Matcher;
use crate::metrics::METRICS;
use crate::obs;

/// Retry budget and per-call deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Extra attempts allowed after the first one.
    pub max_retries: u32,
    /// Deadline applied around each `ask`, on top of the client's own timeout.
    pub call_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            call_timeout: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Hard ceiling on model calls per entry.
    pub fn attempt_budget(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

#[derive(Debug)]
enum State {
    Init,
    AwaitingResponse,
    Evaluating(Result<String, ClientError>),
    Retry,
    Done,
}

/// Drives one entry through ask → match → classify until it is resolved.
#[derive(Debug, Clone)]
pub struct RetryController {
    matcher: Matcher,
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(matcher: Matcher, policy: RetryPolicy) -> Self {
        Self { matcher, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn run_entry(&self, entry: &KbEntry, client: &dyn ModelClient) -> ValidationResult {
        self.drive(entry, client)
            .instrument(obs::entry_span(entry.id()))
            .await
    }

    async fn drive(&self, entry: &KbEntry, client: &dyn ModelClient) -> ValidationResult {
        let budget = self.policy.attempt_budget();
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut attempt_number = 0u32;
        let mut classification: Option<Classification> = None;
        let mut prompt = Prompt::initial(entry.question());
        let mut state = State::Init;

        loop {
            state = match state {
                State::Init => {
                    attempt_number = 0;
                    State::AwaitingResponse
                }
                State::AwaitingResponse => {
                    attempt_number += 1;
                    State::Evaluating(self.ask(client, &prompt).await)
                }
                State::Evaluating(reply) => {
                    let outcome = match reply {
                        Ok(response) => {
                            let assessment =
                                self.matcher.assess(&response, entry.canonical_answer());
                            obs::emit_attempt_recorded(
                                entry.id(),
                                attempt_number,
                                assessment.verdict,
                                assessment.overlap,
                            );
                            AttemptOutcome::Responded {
                                response,
                                verdict: assessment.verdict,
                                overlap: assessment.overlap,
                            }
                        }
                        Err(err) => {
                            METRICS.inc_client_failures();
                            obs::emit_attempt_failed(entry.id(), attempt_number, &err);
                            AttemptOutcome::ClientFailed {
                                error: err.to_string(),
                            }
                        }
                    };

                    let current = classify_outcome(entry, verdict_of(&outcome));
                    let next_prompt = match &outcome {
                        AttemptOutcome::Responded { response, .. } => {
                            Prompt::follow_up(entry.question(), response)
                        }
                        AttemptOutcome::ClientFailed { .. } => Prompt::initial(entry.question()),
                    };
                    let sent = std::mem::replace(&mut prompt, next_prompt);
                    attempts.push(Attempt::new(entry.id(), attempt_number, sent.text, outcome));
                    METRICS.inc_attempts();
                    classification = Some(current);

                    if current == Classification::Hallucination && attempt_number < budget {
                        State::Retry
                    } else {
                        State::Done
                    }
                }
                State::Retry => {
                    METRICS.inc_retries();
                    debug!(
                        entry_id = %entry.id(),
                        next_attempt = attempt_number + 1,
                        budget = budget,
                        "retrying with follow-up prompt"
                    );
                    State::AwaitingResponse
                }
                State::Done => break,
            };
        }

        // The loop always passes through Evaluating at least once.
        let classification =
            classification.unwrap_or_else(|| classify_outcome(entry, None));
        obs::emit_entry_finalized(entry.id(), classification, attempt_number);
        ValidationResult::finalize(entry, classification, attempts)
    }

    async fn ask(&self, client: &dyn ModelClient, prompt: &Prompt) -> Result<String, ClientError> {
        match self.policy.call_timeout {
            Some(limit) => tokio::time::timeout(limit, client.ask(prompt))
                .await
                .unwrap_or_else(|_| {
                    Err(ClientError::Timeout {
                        timeout_ms: limit.as_millis() as u64,
                    })
                }),
            None => client.ask(prompt).await,
        }
    }
}

fn verdict_of(outcome: &AttemptOutcome) -> Option<Verdict> {
    match outcome {
        AttemptOutcome::Responded { verdict, .. } => Some(*verdict),
        AttemptOutcome::ClientFailed { .. } => None,
    }
}

/// Resolve one entry with the default matcher.
pub async fn run_entry(
    entry: &KbEntry,
    client: &dyn ModelClient,
    max_retries: u32,
) -> ValidationResult {
    RetryController::new(Matcher::default(), RetryPolicy::with_max_retries(max_retries))
        .run_entry(entry, client)
        .await
}

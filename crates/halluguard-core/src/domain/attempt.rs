//! Per-call attempt records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::Verdict;

/// What a single model call produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// The model answered and the answer was compared.
    Responded {
        response: String,
        verdict: Verdict,
        /// Canonical-token overlap ratio in 0.0–1.0.
        overlap: f32,
    },
    /// The call failed; no verdict was computed.
    ClientFailed { error: String },
}

/// One model call for one entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    entry_id: String,
    attempt_number: u32,
    prompt: String,
    outcome: AttemptOutcome,
    recorded_at: DateTime<Utc>,
}

impl Attempt {
    pub(crate) fn new(
        entry_id: impl Into<String>,
        attempt_number: u32,
        prompt: impl Into<String>,
        outcome: AttemptOutcome,
    ) -> Self {
        Self {
            entry_id: entry_id.into(),
            attempt_number,
            prompt: prompt.into(),
            outcome,
            recorded_at: Utc::now(),
        }
    }

    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    /// 1-based position of this attempt within its entry.
    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    /// Prompt text sent to the model.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn outcome(&self) -> &AttemptOutcome {
        &self.outcome
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// Raw response text, if the call succeeded.
    pub fn response(&self) -> Option<&str> {
        match &self.outcome {
            AttemptOutcome::Responded { response, .. } => Some(response),
            AttemptOutcome::ClientFailed { .. } => None,
        }
    }

    /// Matcher verdict, if the call succeeded.
    pub fn verdict(&self) -> Option<Verdict> {
        match &self.outcome {
            AttemptOutcome::Responded { verdict, .. } => Some(*verdict),
            AttemptOutcome::ClientFailed { .. } => None,
        }
    }

    pub fn is_client_failure(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::ClientFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let attempt = Attempt::new(
            "1",
            1,
            "What is the chemical formula for water?",
            AttemptOutcome::ClientFailed {
                error: "network failure: reset".to_string(),
            },
        );
        let json = serde_json::to_value(&attempt).expect("serialize");
        assert_eq!(json["outcome"]["status"], "client_failed");
        assert_eq!(json["attempt_number"], 1);
        assert!(attempt.verdict().is_none());
        assert!(attempt.response().is_none());
    }

    #[test]
    fn test_responded_accessors() {
        let attempt = Attempt::new(
            "1",
            2,
            "prompt",
            AttemptOutcome::Responded {
                response: "H2O".to_string(),
                verdict: Verdict::Match,
                overlap: 1.0,
            },
        );
        assert_eq!(attempt.response(), Some("H2O"));
        assert_eq!(attempt.verdict(), Some(Verdict::Match));
        assert!(!attempt.is_client_failure());
    }
}

//! Matcher verdicts and final classifications.

use serde::{Deserialize, Serialize};

/// Raw comparison outcome for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Match,
    Mismatch,
    /// Empty response, refusal, or overlap inside the indeterminate band.
    Ambiguous,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => f.write_str("match"),
            Self::Mismatch => f.write_str("mismatch"),
            Self::Ambiguous => f.write_str("ambiguous"),
        }
    }
}

/// Final category of an entry, decided once after the retry loop ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Correct,
    Hallucination,
    Unverifiable,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Correct => f.write_str("correct"),
            Self::Hallucination => f.write_str("hallucination"),
            Self::Unverifiable => f.write_str("unverifiable"),
        }
    }
}

//! Response-to-fact comparison.
//!
//! Both strings are normalized (case-folded, punctuation stripped,
//! whitespace collapsed) before comparison. A response matches when the
//! canonical token run appears inside it, or when enough of the canonical
//! tokens are present. Refusals and near misses are reported as
//! [`Verdict::Ambiguous`] rather than [`Verdict::Mismatch`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::{ConfigError, Verdict};

/// Phrases that mark a response as a refusal to answer.
pub const DEFAULT_REFUSAL_PHRASES: &[&str] = &[
    "I don't know",
    "I do not know",
    "cannot verify",
    "can't verify",
    "unable to verify",
    "I'm not sure",
    "I am not sure",
    "I cannot answer",
    "I can't answer",
    "unable to answer",
    "no factual information",
    "not enough information",
    "there is no definitive answer",
];

/// Tunable matching policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Overlap ratio that must be exceeded for a match (0.0–1.0).
    pub match_threshold: f32,

    /// Lowest overlap ratio treated as ambiguous rather than a mismatch.
    pub ambiguous_floor: f32,

    /// Refusal phrases, compared after normalization.
    pub refusal_phrases: Vec<String>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            match_threshold: 0.8,
            ambiguous_floor: 0.5,
            refusal_phrases: DEFAULT_REFUSAL_PHRASES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

impl MatcherConfig {
    /// Check `0 <= ambiguous_floor <= match_threshold <= 1`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "matcher.match_threshold".to_string(),
                reason: format!("{} is outside 0.0..=1.0", self.match_threshold),
            });
        }
        if !(0.0..=self.match_threshold).contains(&self.ambiguous_floor) {
            return Err(ConfigError::InvalidValue {
                field: "matcher.ambiguous_floor".to_string(),
                reason: format!(
                    "{} must lie between 0.0 and match_threshold ({})",
                    self.ambiguous_floor, self.match_threshold
                ),
            });
        }
        Ok(())
    }
}

/// Verdict plus the overlap ratio that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    pub verdict: Verdict,
    pub overlap: f32,
}

/// Compares raw responses against canonical answers.
#[derive(Debug, Clone)]
pub struct Matcher {
    config: MatcherConfig,
    refusals: Vec<String>,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatcherConfig::default())
    }
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        let refusals = config
            .refusal_phrases
            .iter()
            .map(|p| normalize(p))
            .filter(|p| !p.is_empty())
            .collect();
        Self { config, refusals }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn compare(&self, raw_response: &str, canonical_answer: &str) -> Verdict {
        self.assess(raw_response, canonical_answer).verdict
    }

    /// Compare and report the overlap ratio alongside the verdict.
    pub fn assess(&self, raw_response: &str, canonical_answer: &str) -> Assessment {
        let response = normalize(raw_response);
        let canonical = normalize(canonical_answer);

        if response.is_empty() || canonical.is_empty() {
            return Assessment {
                verdict: Verdict::Ambiguous,
                overlap: 0.0,
            };
        }

        let overlap = overlap_ratio(&response, &canonical);
        if contains_phrase(&response, &canonical) || overlap > self.config.match_threshold {
            return Assessment {
                verdict: Verdict::Match,
                overlap,
            };
        }

        let refused = self
            .refusals
            .iter()
            .any(|phrase| contains_phrase(&response, phrase));
        let verdict = if refused || overlap >= self.config.ambiguous_floor {
            Verdict::Ambiguous
        } else {
            Verdict::Mismatch
        };
        Assessment { verdict, overlap }
    }
}

/// Lowercase, drop apostrophes, turn other punctuation into spaces and
/// collapse whitespace.
pub fn normalize(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            cleaned.extend(c.to_lowercase());
        } else if matches!(c, '\'' | '\u{2019}' | '`') {
            continue;
        } else {
            cleaned.push(' ');
        }
    }
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Token-aligned substring test on normalized text.
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    format!(" {haystack} ").contains(&format!(" {needle} "))
}

/// Fraction of distinct canonical tokens present in the response.
fn overlap_ratio(response: &str, canonical: &str) -> f32 {
    let response_tokens: HashSet<&str> = response.split(' ').collect();
    let canonical_tokens: HashSet<&str> = canonical.split(' ').collect();
    if canonical_tokens.is_empty() {
        return 0.0;
    }
    let shared = canonical_tokens
        .iter()
        .filter(|t| response_tokens.contains(*t))
        .count();
    shared as f32 / canonical_tokens.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_folds_case_and_punctuation() {
        assert_eq!(normalize("  The Formula is: H2O!  "), "the formula is h2o");
        assert_eq!(normalize("Water's formula"), "waters formula");
        assert_eq!(normalize("well-known\tfact\n"), "well known fact");
        assert_eq!(normalize("?!"), "");
    }

    #[test]
    fn test_sentence_containing_answer_matches() {
        let m = Matcher::default();
        assert_eq!(
            m.compare("The chemical formula for water is H2O.", "H2O"),
            Verdict::Match
        );
    }

    #[test]
    fn test_identical_after_normalization_matches() {
        let m = Matcher::default();
        assert_eq!(m.compare("  h2o. ", "H2O"), Verdict::Match);
    }

    #[test]
    fn test_wrong_fact_is_mismatch() {
        let m = Matcher::default();
        assert_eq!(m.compare("Water's formula is CO2.", "H2O"), Verdict::Mismatch);
    }

    #[test]
    fn test_substring_is_token_aligned() {
        let m = Matcher::default();
        assert_eq!(m.compare("It ended in 1945.", "4"), Verdict::Mismatch);
        assert_eq!(m.compare("There are 4 seasons.", "4"), Verdict::Match);
    }

    #[test]
    fn test_paraphrase_above_threshold_matches() {
        let m = Matcher::default();
        // All five canonical tokens are present, in a different order.
        assert_eq!(
            m.compare(
                "Written by William Shakespeare: Romeo and Juliet.",
                "Romeo and Juliet William Shakespeare"
            ),
            Verdict::Match
        );
    }

    #[test]
    fn test_partial_overlap_is_ambiguous() {
        let m = Matcher::default();
        let a = m.assess("It was Isaac somebody, I think.", "Isaac Newton");
        assert_eq!(a.verdict, Verdict::Ambiguous);
        assert!((a.overlap - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_response_is_ambiguous() {
        let m = Matcher::default();
        assert_eq!(m.compare("", "H2O"), Verdict::Ambiguous);
        assert_eq!(m.compare("  ...  ", "H2O"), Verdict::Ambiguous);
    }

    #[test]
    fn test_refusal_is_ambiguous() {
        let m = Matcher::default();
        assert_eq!(m.compare("I don't know.", "H2O"), Verdict::Ambiguous);
        assert_eq!(
            m.compare("Sorry, I cannot verify that claim.", "Paris"),
            Verdict::Ambiguous
        );
    }

    #[test]
    fn test_hedged_correct_answer_still_matches() {
        let m = Matcher::default();
        assert_eq!(m.compare("I'm not sure, but I believe it is Paris.", "Paris"), Verdict::Match);
    }

    #[test]
    fn test_empty_canonical_is_ambiguous() {
        let m = Matcher::default();
        assert_eq!(m.compare("Atlantis had no capital.", ""), Verdict::Ambiguous);
    }

    #[test]
    fn test_custom_refusal_phrases() {
        let m = Matcher::new(MatcherConfig {
            refusal_phrases: vec!["no comment".to_string()],
            ..MatcherConfig::default()
        });
        assert_eq!(m.compare("No comment!", "Paris"), Verdict::Ambiguous);
        assert_eq!(m.compare("I don't know", "Paris"), Verdict::Mismatch);
    }

    #[test]
    fn test_config_validation() {
        assert!(MatcherConfig::default().validate().is_ok());

        let bad = MatcherConfig {
            match_threshold: 1.5,
            ..MatcherConfig::default()
        };
        assert!(bad.validate().is_err());

        let inverted = MatcherConfig {
            match_threshold: 0.4,
            ambiguous_floor: 0.6,
            ..MatcherConfig::default()
        };
        assert!(inverted.validate().is_err());
    }
}

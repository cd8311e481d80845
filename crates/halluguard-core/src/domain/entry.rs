//! Knowledge base entries.

use serde::{Deserialize, Serialize};

/// Domain tag of a knowledge base entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Question with a verifiable canonical answer.
    Factual,
    /// Question with no objective ground truth (future, fictional,
    /// philosophical, unmeasurable).
    EdgeCase,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Factual => "factual",
            Self::EdgeCase => "edge_case",
        }
    }

    /// Parse a domain tag, accepting only the two known values.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "factual" => Some(Self::Factual),
            "edge_case" => Some(Self::EdgeCase),
            _ => None,
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable fact in the knowledge base.
///
/// Fields are private; entries are only constructed by the knowledge base
/// loader, which enforces id uniqueness and non-empty answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KbEntry {
    id: String,
    question: String,
    canonical_answer: String,
    domain: Domain,
}

impl KbEntry {
    pub(crate) fn new(
        id: String,
        question: String,
        canonical_answer: String,
        domain: Domain,
    ) -> Self {
        Self {
            id,
            question,
            canonical_answer,
            domain,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// Canonical answer. Empty for edge-case entries loaded without one.
    pub fn canonical_answer(&self) -> &str {
        &self.canonical_answer
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn is_edge_case(&self) -> bool {
        self.domain == Domain::EdgeCase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_parse_known_tags() {
        assert_eq!(Domain::parse("factual"), Some(Domain::Factual));
        assert_eq!(Domain::parse("edge_case"), Some(Domain::EdgeCase));
        assert_eq!(Domain::parse("Factual"), None);
        assert_eq!(Domain::parse("edge-case"), None);
    }

    #[test]
    fn test_domain_serde_uses_snake_case() {
        let json = serde_json::to_string(&Domain::EdgeCase).expect("serialize");
        assert_eq!(json, "\"edge_case\"");
    }

    #[test]
    fn test_entry_accessors() {
        let entry = KbEntry::new(
            "1".to_string(),
            "What is the chemical formula for water?".to_string(),
            "H2O".to_string(),
            Domain::Factual,
        );
        assert_eq!(entry.id(), "1");
        assert_eq!(entry.canonical_answer(), "H2O");
        assert!(!entry.is_edge_case());
    }
}

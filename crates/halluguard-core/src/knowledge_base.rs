//! Immutable knowledge base of ground-truth facts.
//!
//! Loose JSON records are parsed into strongly-typed [`KbEntry`] values and
//! validated once at load time:
//! - ids are unique (explicit and position-assigned ids share one namespace)
//! - questions are non-empty
//! - factual entries carry a canonical answer with at least one letter or
//!   digit
//! - domain tags are `factual` or `edge_case`
//!
//! Three document shapes are accepted: a bare array of records, an object
//! with an `entries` array, and the legacy `{"qa_pairs": [...],
//! "edge_cases": [...]}` layout.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::domain::{ConfigError, Domain, KbEntry};
use crate::matcher::normalize;

/// Edge-case questions bundled with the tool. None has a canonical answer.
pub const DEFAULT_EDGE_CASES: &[&str] = &[
    "What is the capital of the ancient Atlantis?",
    "How many atoms are in a human thought?",
    "What color is the number 7?",
    "What is the sound of one hand clapping?",
    "Can you explain quantum physics to a goldfish?",
    "Will there be a cure for aging by 2100?",
];

/// Record id as it appears in JSON: either a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Text(String),
    Number(u64),
}

impl RecordId {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// One unvalidated knowledge base record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KbRecord {
    #[serde(default)]
    pub id: Option<RecordId>,
    pub question: String,
    #[serde(default)]
    pub answer: Option<String>,
    /// Defaults to `factual` when absent.
    #[serde(default)]
    pub domain: Option<String>,
}

impl KbRecord {
    pub fn factual(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: None,
            question: question.into(),
            answer: Some(answer.into()),
            domain: None,
        }
    }

    pub fn edge_case(question: impl Into<String>) -> Self {
        Self {
            id: None,
            question: question.into(),
            answer: None,
            domain: Some(Domain::EdgeCase.as_str().to_string()),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(RecordId::Text(id.into()));
        self
    }
}

#[derive(Debug, Deserialize)]
struct LegacyPair {
    question: String,
    answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KbDocument {
    Records(Vec<KbRecord>),
    Entries {
        entries: Vec<KbRecord>,
    },
    Legacy {
        qa_pairs: Vec<LegacyPair>,
        #[serde(default)]
        edge_cases: Vec<String>,
    },
}

impl KbDocument {
    fn into_records(self) -> Vec<KbRecord> {
        match self {
            Self::Records(records) | Self::Entries { entries: records } => records,
            Self::Legacy {
                qa_pairs,
                edge_cases,
            } => qa_pairs
                .into_iter()
                .map(|p| KbRecord::factual(p.question, p.answer))
                .chain(edge_cases.into_iter().map(KbRecord::edge_case))
                .collect(),
        }
    }
}

/// Read-only table of fact entries in load order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    entries: Vec<KbEntry>,
}

impl KnowledgeBase {
    /// Load and validate a knowledge base from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::MissingSource {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Malformed {
            reason: format!("read {}: {e}", path.display()),
        })?;
        let kb = Self::from_json_str(&raw)?;
        debug!(path = %path.display(), entries = kb.len(), "knowledge base loaded");
        Ok(kb)
    }

    /// Parse and validate a knowledge base from a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let doc: KbDocument = serde_json::from_str(raw).map_err(|e| ConfigError::Malformed {
            reason: format!(
                "expected an array of records, an object with `entries`, or a `qa_pairs` document: {e}"
            ),
        })?;
        Self::from_records(doc.into_records())
    }

    /// Validate records in order and build the knowledge base.
    pub fn from_records(records: Vec<KbRecord>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut entries = Vec::with_capacity(records.len());

        for (index, record) in records.into_iter().enumerate() {
            let entry = validate_record(index, record)?;
            if !seen.insert(entry.id().to_string()) {
                return Err(ConfigError::DuplicateId {
                    id: entry.id().to_string(),
                });
            }
            entries.push(entry);
        }

        Ok(Self { entries })
    }

    /// Return a copy with [`DEFAULT_EDGE_CASES`] appended as `edge-1..edge-n`.
    pub fn with_default_edge_cases(self) -> Result<Self, ConfigError> {
        let mut records: Vec<KbRecord> = self
            .entries
            .into_iter()
            .map(|e| KbRecord {
                id: Some(RecordId::Text(e.id().to_string())),
                question: e.question().to_string(),
                answer: Some(e.canonical_answer().to_string()).filter(|a| !a.is_empty()),
                domain: Some(e.domain().as_str().to_string()),
            })
            .collect();
        records.extend(
            DEFAULT_EDGE_CASES
                .iter()
                .enumerate()
                .map(|(i, q)| KbRecord::edge_case(*q).with_id(format!("edge-{}", i + 1))),
        );
        Self::from_records(records)
    }

    /// All entries in load order.
    pub fn get_all(&self) -> &[KbEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&KbEntry> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_by_domain(&self, domain: Domain) -> usize {
        self.entries.iter().filter(|e| e.domain() == domain).count()
    }
}

fn validate_record(index: usize, record: KbRecord) -> Result<KbEntry, ConfigError> {
    let id = record
        .id
        .map(RecordId::into_string)
        .unwrap_or_else(|| (index + 1).to_string());

    let domain = match record.domain.as_deref() {
        None => Domain::Factual,
        Some(tag) => Domain::parse(tag).ok_or_else(|| ConfigError::UnknownDomain {
            id: id.clone(),
            tag: tag.to_string(),
        })?,
    };

    if record.question.trim().is_empty() {
        return Err(ConfigError::EmptyQuestion { id });
    }

    let answer = record.answer.unwrap_or_default();
    // An answer with no letters or digits can never be matched.
    if domain == Domain::Factual && normalize(&answer).is_empty() {
        return Err(ConfigError::EmptyAnswer { id });
    }

    Ok(KbEntry::new(id, record.question, answer, domain))
}

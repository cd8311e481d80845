//! Offline model client backed by recorded responses.
//!
//! Accepts a `responses.json` collection log (an array of
//! `{question, model_response}` objects, where a `null`
//! response marks a failed call) or a map from question to one answer or a
//! list of answers. Answers for the same question are served in order.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::{ModelClient, Prompt};
use crate::domain::{ClientError, ConfigError};

/// Row kind for a knowledge base question with a canonical answer.
pub const ROW_KIND_KB_QUESTION: &str = "kb_question";
/// Row kind for an edge-case question.
pub const ROW_KIND_EDGE_CASE: &str = "edge_case";

/// One row of a `responses.json` collection log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRow {
    pub question: String,
    /// `None` when the call failed.
    #[serde(default)]
    pub model_response: Option<String>,
    /// `kb_question` or `edge_case`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub kb_answer: Option<String>,
    /// Full prompt text, when it differs from the question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordedAnswers {
    One(Option<String>),
    Many(Vec<Option<String>>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordedDocument {
    Rows(Vec<ResponseRow>),
    ByQuestion(HashMap<String, RecordedAnswers>),
}

/// Replays recorded answers keyed by the knowledge base question.
#[derive(Debug)]
pub struct RecordedClient {
    identity: String,
    answers: Mutex<HashMap<String, VecDeque<Option<String>>>>,
}

impl RecordedClient {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            answers: Mutex::new(HashMap::new()),
        }
    }

    /// Queue an answer for `question`.
    pub fn with_answer(self, question: impl Into<String>, answer: impl Into<String>) -> Self {
        self.push(question.into(), Some(answer.into()));
        self
    }

    /// Queue a failed call for `question`.
    pub fn with_failure(self, question: impl Into<String>) -> Self {
        self.push(question.into(), None);
        self
    }

    pub fn load(path: &Path, identity: impl Into<String>) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::MissingSource {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Malformed {
            reason: format!("read {}: {e}", path.display()),
        })?;
        Self::from_json_str(&raw, identity)
    }

    pub fn from_json_str(raw: &str, identity: impl Into<String>) -> Result<Self, ConfigError> {
        let doc: RecordedDocument =
            serde_json::from_str(raw).map_err(|e| ConfigError::Malformed {
                reason: format!("recorded responses: {e}"),
            })?;
        let client = Self::new(identity);
        match doc {
            RecordedDocument::Rows(rows) => {
                for row in rows {
                    client.push(row.question, row.model_response);
                }
            }
            RecordedDocument::ByQuestion(map) => {
                for (question, answers) in map {
                    match answers {
                        RecordedAnswers::One(answer) => client.push(question, answer),
                        RecordedAnswers::Many(list) => {
                            for answer in list {
                                client.push(question.clone(), answer);
                            }
                        }
                    }
                }
            }
        }
        Ok(client)
    }

    /// Number of recorded answers not yet served.
    pub fn remaining(&self) -> usize {
        self.lock().values().map(VecDeque::len).sum()
    }

    fn push(&self, question: String, answer: Option<String>) {
        self.lock().entry(question).or_default().push_back(answer);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, VecDeque<Option<String>>>> {
        self.answers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ModelClient for RecordedClient {
    async fn ask(&self, prompt: &Prompt) -> Result<String, ClientError> {
        let next = self
            .lock()
            .get_mut(&prompt.question)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Some(answer)) => Ok(answer),
            Some(None) => Err(ClientError::Network(
                "recorded call failed without a response".to_string(),
            )),
            None => Err(ClientError::MalformedResponse(format!(
                "no recorded response left for question: {}",
                prompt.question
            ))),
        }
    }

    fn identity(&self) -> &str {
        &self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rows_document_serves_in_order() {
        let client = RecordedClient::from_json_str(
            r#"[
                {"question": "Q1", "model_response": "first", "type": "kb_question", "kb_answer": "a"},
                {"question": "Q1", "model_response": "second"},
                {"question": "Q2", "model_response": null, "type": "edge_case", "kb_answer": null}
            ]"#,
            "recorded",
        )
        .expect("parse");

        assert_eq!(client.remaining(), 3);
        assert_eq!(client.ask(&Prompt::initial("Q1")).await.unwrap(), "first");
        assert_eq!(
            client.ask(&Prompt::follow_up("Q1", "first")).await.unwrap(),
            "second"
        );
        assert!(matches!(
            client.ask(&Prompt::initial("Q2")).await,
            Err(ClientError::Network(_))
        ));
        assert!(matches!(
            client.ask(&Prompt::initial("Q1")).await,
            Err(ClientError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_map_document_accepts_single_and_lists() {
        let client = RecordedClient::from_json_str(
            r#"{"Q1": "only", "Q2": ["x", null, "y"]}"#,
            "recorded",
        )
        .expect("parse");
        assert_eq!(client.remaining(), 4);
        assert_eq!(client.ask(&Prompt::initial("Q1")).await.unwrap(), "only");
        assert_eq!(client.ask(&Prompt::initial("Q2")).await.unwrap(), "x");
        assert!(client.ask(&Prompt::initial("Q2")).await.is_err());
        assert_eq!(client.ask(&Prompt::initial("Q2")).await.unwrap(), "y");
    }

    #[test]
    fn test_malformed_document_is_config_error() {
        let err = RecordedClient::from_json_str("42", "recorded").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_builder_queues_answers_and_failures() {
        let client = RecordedClient::new("built")
            .with_failure("Q")
            .with_answer("Q", "ok");
        assert_eq!(client.identity(), "built");
        assert!(client.ask(&Prompt::initial("Q")).await.is_err());
        assert_eq!(client.ask(&Prompt::initial("Q")).await.unwrap(), "ok");
    }
}

//! Recording decorator for model clients.
//!
//! [`RecordingClient`] forwards every prompt to the wrapped client and logs
//! the exchange as a [`ResponseRow`]. The log is written in the
//! `responses.json` layout that [`RecordedClient`](crate::recorded::RecordedClient)
//! replays, so a live run can be re-validated offline with the same answers.
//!
//! A row is opened before the call and filled in when it returns. A call
//! that fails, or is abandoned by the retry controller's deadline, stays
//! `null` and replays as a failed call.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::info;

use crate::client::{ModelClient, Prompt, PromptKind};
use crate::domain::{ClientError, Domain, Result};
use crate::knowledge_base::KnowledgeBase;
use crate::recorded::{ResponseRow, ROW_KIND_EDGE_CASE, ROW_KIND_KB_QUESTION};

/// Wraps a [`ModelClient`] and records every call it serves.
#[derive(Debug)]
pub struct RecordingClient<C> {
    inner: C,
    rows: Mutex<Vec<ResponseRow>>,
}

impl<C: ModelClient> RecordingClient<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Rows recorded so far, in call order.
    pub fn rows(&self) -> Vec<ResponseRow> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Write the recorded rows to `path` as a JSON array.
    ///
    /// When `kb` is given, each row is annotated with the entry's `type` and
    /// `kb_answer`.
    pub fn write_responses(&self, path: &Path, kb: Option<&KnowledgeBase>) -> Result<usize> {
        let mut rows = self.rows();
        if let Some(kb) = kb {
            for row in &mut rows {
                annotate(row, kb);
            }
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(&rows)?)?;
        info!(path = %path.display(), rows = rows.len(), "recorded responses written");
        Ok(rows.len())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ResponseRow>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn annotate(row: &mut ResponseRow, kb: &KnowledgeBase) {
    let Some(entry) = kb.get_all().iter().find(|e| e.question() == row.question) else {
        return;
    };
    match entry.domain() {
        Domain::Factual => {
            row.kind = Some(ROW_KIND_KB_QUESTION.to_string());
            row.kb_answer = Some(entry.canonical_answer().to_string());
        }
        Domain::EdgeCase => {
            row.kind = Some(ROW_KIND_EDGE_CASE.to_string());
            row.kb_answer = None;
        }
    }
}

#[async_trait]
impl<C: ModelClient> ModelClient for RecordingClient<C> {
    async fn ask(&self, prompt: &Prompt) -> std::result::Result<String, ClientError> {
        let slot = {
            let mut rows = self.lock();
            rows.push(ResponseRow {
                question: prompt.question.clone(),
                model_response: None,
                kind: None,
                kb_answer: None,
                prompt: (prompt.kind == PromptKind::FollowUp).then(|| prompt.text.clone()),
            });
            rows.len() - 1
        };

        let reply = self.inner.ask(prompt).await;
        if let Ok(answer) = &reply {
            if let Some(row) = self.lock().get_mut(slot) {
                row.model_response = Some(answer.clone());
            }
        }
        reply
    }

    fn identity(&self) -> &str {
        self.inner.identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge_base::KbRecord;
    use crate::recorded::RecordedClient;

    #[tokio::test]
    async fn test_records_answers_and_failures_in_call_order() {
        let inner = RecordedClient::new("live")
            .with_answer("Q1", "first")
            .with_failure("Q1")
            .with_answer("Q2", "second");
        let client = RecordingClient::new(inner);

        client.ask(&Prompt::initial("Q1")).await.unwrap();
        assert!(client.ask(&Prompt::follow_up("Q1", "first")).await.is_err());
        client.ask(&Prompt::initial("Q2")).await.unwrap();

        let rows = client.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].model_response.as_deref(), Some("first"));
        assert_eq!(rows[0].prompt, None);
        assert_eq!(rows[1].model_response, None);
        assert!(rows[1].prompt.as_deref().unwrap().contains("first"));
        assert_eq!(rows[2].question, "Q2");
        assert_eq!(client.identity(), "live");
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_call_stays_null() {
        struct Stalled;

        #[async_trait]
        impl ModelClient for Stalled {
            async fn ask(&self, _prompt: &Prompt) -> std::result::Result<String, ClientError> {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                Ok("late".to_string())
            }

            fn identity(&self) -> &str {
                "stalled"
            }
        }

        let client = RecordingClient::new(Stalled);
        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            client.ask(&Prompt::initial("Q")),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(client.len(), 1);
        assert_eq!(client.rows()[0].model_response, None);
    }

    #[tokio::test]
    async fn test_written_rows_carry_kb_annotations() {
        let kb = KnowledgeBase::from_records(vec![
            KbRecord::factual("Q1", "A1"),
            KbRecord::edge_case("Q2"),
        ])
        .unwrap();
        let client = RecordingClient::new(
            RecordedClient::new("live")
                .with_answer("Q1", "A1")
                .with_answer("Q2", "maybe"),
        );
        client.ask(&Prompt::initial("Q1")).await.unwrap();
        client.ask(&Prompt::initial("Q2")).await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("responses.json");
        assert_eq!(client.write_responses(&path, Some(&kb)).unwrap(), 2);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["type"], "kb_question");
        assert_eq!(raw[0]["kb_answer"], "A1");
        assert_eq!(raw[1]["type"], "edge_case");
        assert!(raw[1]["kb_answer"].is_null());
        assert_eq!(raw[1]["model_response"], "maybe");
    }
}

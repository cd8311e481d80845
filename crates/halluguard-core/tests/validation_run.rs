//! End-to-end validation runs against scripted and recorded model clients.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use halluguard_core::{
    cancel_pair, execute, Classification, ClientError, GuardError, KbRecord, KnowledgeBase,
    Matcher, ModelClient, Prompt, PromptKind, RecordedClient, RetryPolicy, ValidationRun,
    Verdict,
};

const WATER_Q: &str = "What is the chemical formula for water?";
const AGING_Q: &str = "Will there be a cure for aging by 2100?";

/// Answers every prompt with the same text and records what it was asked.
struct Constant {
    answer: String,
    seen: Mutex<Vec<Prompt>>,
}

impl Constant {
    fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ModelClient for Constant {
    async fn ask(&self, prompt: &Prompt) -> Result<String, ClientError> {
        self.seen.lock().unwrap().push(prompt.clone());
        Ok(self.answer.clone())
    }

    fn identity(&self) -> &str {
        "constant"
    }
}

/// Fails every call.
struct Unreachable;

#[async_trait]
impl ModelClient for Unreachable {
    async fn ask(&self, _prompt: &Prompt) -> Result<String, ClientError> {
        Err(ClientError::Network("connection refused".to_string()))
    }

    fn identity(&self) -> &str {
        "unreachable"
    }
}

/// Serves replies in order regardless of question.
struct Scripted {
    replies: Mutex<VecDeque<String>>,
    seen: Mutex<Vec<Prompt>>,
}

impl Scripted {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ModelClient for Scripted {
    async fn ask(&self, prompt: &Prompt) -> Result<String, ClientError> {
        self.seen.lock().unwrap().push(prompt.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::MalformedResponse("script exhausted".to_string()))
    }

    fn identity(&self) -> &str {
        "scripted"
    }
}

fn water_kb() -> KnowledgeBase {
    KnowledgeBase::from_records(vec![KbRecord::factual(WATER_Q, "H2O")]).unwrap()
}

#[tokio::test]
async fn exact_answer_is_correct_on_first_attempt() {
    let client = Constant::new("The chemical formula for water is H2O.");
    let report = execute(&water_kb(), &client, 2).await.unwrap();

    let result = &report.results()[0];
    assert_eq!(result.classification(), Classification::Correct);
    assert_eq!(result.total_attempts(), 1);
    assert_eq!(result.attempts()[0].verdict(), Some(Verdict::Match));
    assert_eq!(report.stats().correct, 1);
    assert_eq!(report.stats().accuracy(), 1.0);
}

#[tokio::test]
async fn wrong_then_right_answer_recovers_after_one_retry() {
    let client = Scripted::new(&["Water's formula is CO2.", "H2O"]);
    let report = execute(&water_kb(), &client, 2).await.unwrap();

    let result = &report.results()[0];
    assert_eq!(result.classification(), Classification::Correct);
    assert_eq!(result.total_attempts(), 2);
    assert_eq!(result.attempts()[0].verdict(), Some(Verdict::Mismatch));
    assert_eq!(result.attempts()[1].verdict(), Some(Verdict::Match));
    assert_eq!(result.final_response(), Some("H2O"));

    let seen = client.seen.lock().unwrap();
    assert_eq!(seen[1].kind, PromptKind::FollowUp);
    assert!(seen[1].text.contains("Water's formula is CO2."));
    assert!(seen[1].text.ends_with(WATER_Q));
}

#[tokio::test]
async fn edge_case_is_unverifiable_without_retry() {
    let kb = KnowledgeBase::from_records(vec![KbRecord::edge_case(AGING_Q)]).unwrap();
    let client = Constant::new("Purple elephants will dance on Mars.");
    let report = execute(&kb, &client, 2).await.unwrap();

    let result = &report.results()[0];
    assert_eq!(result.classification(), Classification::Unverifiable);
    assert_eq!(result.total_attempts(), 1);
    assert_eq!(client.seen.lock().unwrap().len(), 1);
    assert_eq!(report.stats().unverifiable, 1);
    assert_eq!(report.stats().retries(), 0);
}

#[tokio::test]
async fn unrelated_answers_exhaust_the_attempt_budget() {
    for max_retries in [0u32, 1, 3] {
        let client = Constant::new("Bananas are a good source of potassium.");
        let report = execute(&water_kb(), &client, max_retries).await.unwrap();

        let result = &report.results()[0];
        assert_eq!(result.classification(), Classification::Hallucination);
        assert_eq!(result.total_attempts(), max_retries + 1);
        assert_eq!(report.stats().hallucinations, 1);
        assert_eq!(report.stats().retries(), u64::from(max_retries));
    }
}

#[tokio::test]
async fn attempt_numbers_start_at_one_and_increase() {
    let client = Constant::new("I don't know.");
    let report = execute(&water_kb(), &client, 3).await.unwrap();

    let numbers: Vec<u32> = report.results()[0]
        .attempts()
        .iter()
        .map(|a| a.attempt_number())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert!(report.results()[0]
        .attempts()
        .iter()
        .all(|a| a.verdict() == Some(Verdict::Ambiguous)));
}

#[tokio::test]
async fn client_failures_on_every_attempt_are_hallucinations() {
    let report = execute(&water_kb(), &Unreachable, 2).await.unwrap();

    let result = &report.results()[0];
    assert_eq!(result.classification(), Classification::Hallucination);
    assert_eq!(result.total_attempts(), 3);
    assert!(result.attempts().iter().all(|a| a.is_client_failure()));
    assert_eq!(result.final_response(), None);
}

#[tokio::test]
async fn entries_are_resolved_in_load_order_and_independently() {
    let kb = KnowledgeBase::from_records(vec![
        KbRecord::factual("What is the capital of France?", "Paris").with_id("france"),
        KbRecord::factual(WATER_Q, "H2O").with_id("water"),
        KbRecord::edge_case(AGING_Q).with_id("aging"),
    ])
    .unwrap();
    let client = RecordedClient::new("recorded")
        .with_answer("What is the capital of France?", "Lyon")
        .with_answer("What is the capital of France?", "Marseille")
        .with_answer("What is the capital of France?", "Nice")
        .with_answer(WATER_Q, "H2O")
        .with_answer(AGING_Q, "Probably not.");

    let report = execute(&kb, &client, 2).await.unwrap();

    let ids: Vec<&str> = report.results().iter().map(|r| r.entry_id()).collect();
    assert_eq!(ids, vec!["france", "water", "aging"]);
    assert_eq!(
        report.result_for("france").unwrap().classification(),
        Classification::Hallucination
    );
    assert_eq!(
        report.result_for("water").unwrap().classification(),
        Classification::Correct
    );
    assert_eq!(
        report.result_for("aging").unwrap().classification(),
        Classification::Unverifiable
    );
    assert_eq!(report.stats().total, 3);
    assert_eq!(report.stats().total_attempts, 5);
    assert_eq!(client.remaining(), 0);
    assert_eq!(report.model(), "recorded");
}

#[tokio::test]
async fn cancellation_before_first_entry_returns_no_report() {
    let (handle, signal) = cancel_pair();
    handle.cancel();

    let run = ValidationRun::new(Matcher::default(), RetryPolicy::default());
    let err = run
        .execute(&water_kb(), &Constant::new("H2O"), &signal)
        .await
        .unwrap_err();

    assert!(matches!(err, GuardError::Cancelled { completed: 0 }));
}

#[tokio::test]
async fn empty_knowledge_base_produces_empty_report() {
    let kb = KnowledgeBase::from_records(Vec::new()).unwrap();
    let report = execute(&kb, &Constant::new("anything"), 2).await.unwrap();

    assert!(report.results().is_empty());
    assert_eq!(report.stats().total, 0);
    assert_eq!(report.stats().accuracy(), 0.0);
}

#[tokio::test]
async fn rerunning_the_same_script_classifies_identically() {
    let first = execute(&water_kb(), &Scripted::new(&["CO2", "H2O"]), 2)
        .await
        .unwrap();
    let second = execute(&water_kb(), &Scripted::new(&["CO2", "H2O"]), 2)
        .await
        .unwrap();

    assert_ne!(first.run_id(), second.run_id());
    assert_eq!(first.stats(), second.stats());
    assert_eq!(
        first.results()[0].classification(),
        second.results()[0].classification()
    );
}

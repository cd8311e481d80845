//! Model client contract.
//!
//! The validation core never talks to a provider directly. It sends a
//! [`Prompt`] through a [`ModelClient`] and receives either the answer text
//! or a [`ClientError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::ClientError;

/// Whether a prompt is the first question or a re-verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Initial,
    FollowUp,
}

/// A question to send to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// The knowledge base question this prompt is about.
    pub question: String,
    /// Full text sent to the model.
    pub text: String,
    pub kind: PromptKind,
}

impl Prompt {
    pub fn initial(question: &str) -> Self {
        Self {
            question: question.to_string(),
            text: question.to_string(),
            kind: PromptKind::Initial,
        }
    }

    /// Re-ask `question`, naming the answer that was rejected.
    pub fn follow_up(question: &str, rejected_answer: &str) -> Self {
        let text = format!(
            "Your previous answer to this question was: \"{}\"\n\
             That answer could not be verified against a trusted reference. \
             Re-check the facts and answer again directly and concisely. \
             If you do not have reliable factual information, say so explicitly.\n\
             Question: {question}",
            rejected_answer.trim()
        );
        Self {
            question: question.to_string(),
            text,
            kind: PromptKind::FollowUp,
        }
    }
}

/// Request/response access to a language model.
///
/// Implementations handle their own transport-level retries; an `Err` means
/// no usable response for this attempt.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn ask(&self, prompt: &Prompt) -> Result<String, ClientError>;

    /// Model identity recorded in reports.
    fn identity(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_prompt_is_the_question() {
        let p = Prompt::initial("What is the chemical formula for water?");
        assert_eq!(p.text, p.question);
        assert_eq!(p.kind, PromptKind::Initial);
    }

    #[test]
    fn test_follow_up_names_rejected_answer() {
        let p = Prompt::follow_up("What is the chemical formula for water?", " CO2 \n");
        assert_eq!(p.kind, PromptKind::FollowUp);
        assert!(p.text.contains("\"CO2\""));
        assert!(p.text.ends_with("Question: What is the chemical formula for water?"));
    }
}

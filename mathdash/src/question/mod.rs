//! Math questions: the data shown to the player, the difficulty tiers, the
//! fixed fallback bank and the generator that asks a chat-completion
//! service for fresh questions.

pub mod fallback;
pub mod generator;
pub mod transport;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::QuestionError;

pub use fallback::fallback_question;
pub use generator::{PendingQuestion, QuestionGenerator};
pub use transport::{ChatMessage, ChatRequest, ChatTransport, UreqTransport};

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

/// A multiple-choice question. Immutable once shown.
///
/// The serialized field names match the JSON object the question service is
/// asked to produce.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub prompt: String,
    #[serde(rename = "answer", deserialize_with = "text_value")]
    pub correct_answer: String,
    #[serde(deserialize_with = "text_values")]
    pub options: Vec<String>,
}

impl Question {
    pub fn new(prompt: impl Into<String>, correct_answer: impl Into<String>, options: [&str; OPTION_COUNT]) -> Self {
        Self {
            prompt: prompt.into(),
            correct_answer: correct_answer.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    /// True if `selected` is exactly the correct answer text.
    pub fn is_correct(&self, selected: &str) -> bool {
        selected == self.correct_answer
    }

    pub fn contains_answer(&self) -> bool {
        self.options.iter().any(|o| *o == self.correct_answer)
    }

    /// Reject questions the panel cannot show sensibly.
    pub fn validate(&self) -> Result<(), QuestionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::InvalidQuestion("empty prompt"));
        }
        if self.correct_answer.trim().is_empty() {
            return Err(QuestionError::InvalidQuestion("empty answer"));
        }
        if self.options.len() != OPTION_COUNT {
            return Err(QuestionError::InvalidQuestion("expected exactly four options"));
        }
        Ok(())
    }
}

/// Difficulty bucket derived from the number of correct answers so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DifficultyTier {
    Easy,
    Medium,
    Hard,
}

impl DifficultyTier {
    /// `>= hard_threshold` is Hard, `>= medium_threshold` is Medium, else Easy.
    pub fn from_correct_answers(correct: u32, medium_threshold: u32, hard_threshold: u32) -> Self {
        if correct >= hard_threshold {
            DifficultyTier::Hard
        } else if correct >= medium_threshold {
            DifficultyTier::Medium
        } else {
            DifficultyTier::Easy
        }
    }

    /// Instruction sent as the user message for this tier.
    pub fn prompt(self) -> &'static str {
        match self {
            DifficultyTier::Easy => "Generate an easy math question for elementary school students involving addition or subtraction with numbers between 1 and 20.",
            DifficultyTier::Medium => "Generate a medium difficulty math question for middle school students involving multiplication or division with numbers between 1 and 100.",
            DifficultyTier::Hard => "Generate a challenging math question for high school students involving exponents, brackets, or multi-step operations.",
        }
    }
}

// Language models answer `"answer": 15` as often as `"answer": "15"`.
fn text_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    value_to_text(value).map_err(serde::de::Error::custom)
}

fn text_values<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
    values
        .into_iter()
        .map(value_to_text)
        .collect::<Result<_, _>>()
        .map_err(serde::de::Error::custom)
}

fn value_to_text(value: serde_json::Value) -> Result<String, String> {
    match value {
        serde_json::Value::String(s) => Ok(s.trim().to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("expected text or number, found {other}")),
    }
}

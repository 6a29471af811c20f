//! Asks a chat-completion service for a question on a worker thread.
//!
//! Generation never fails from the caller's point of view: every error path
//! ends in the tier's fallback question.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use super::fallback::fallback_question;
use super::transport::{ChatMessage, ChatRequest, ChatResponse, ChatTransport, UreqTransport};
use super::{DifficultyTier, Question};
use crate::config::QuestionServiceConfig;
use crate::error::QuestionError;

const SYSTEM_PROMPT: &str = "You are a math teacher creating questions for a game. Respond ONLY with a JSON object containing 'question', 'answer' (the correct numerical answer), and 'options' (an array of 4 possible answers including the correct one).";

/// A question being generated. Poll it once per tick.
pub struct PendingQuestion {
    tier: DifficultyTier,
    receiver: Receiver<Question>,
}

impl PendingQuestion {
    /// A pending question that is already answered.
    fn ready(tier: DifficultyTier, question: Question) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        // The receiver is alive, so a bounded(1) send cannot fail.
        let _ = sender.send(question);
        Self { tier, receiver }
    }

    pub fn tier(&self) -> DifficultyTier {
        self.tier
    }

    /// The question, if the worker has delivered it.
    ///
    /// A worker that vanished without answering counts as a failure and
    /// yields the fallback question.
    pub fn try_take(&self) -> Option<Question> {
        match self.receiver.try_recv() {
            Ok(question) => Some(question),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Question worker exited without a result, using fallback");
                Some(fallback_question(self.tier))
            }
        }
    }

    /// Block until the question arrives or `timeout` passes.
    pub fn wait(self, timeout: Duration) -> Question {
        match self.receiver.recv_timeout(timeout) {
            Ok(question) => question,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Question generation timed out after {:?}, using fallback", timeout);
                fallback_question(self.tier)
            }
            Err(RecvTimeoutError::Disconnected) => fallback_question(self.tier),
        }
    }
}

/// Produces questions for a difficulty tier.
///
/// Without a transport the generator is offline and serves fallback
/// questions only.
#[derive(Clone)]
pub struct QuestionGenerator {
    transport: Option<Arc<dyn ChatTransport>>,
    model: String,
}

impl QuestionGenerator {
    pub fn new(transport: Arc<dyn ChatTransport>, model: impl Into<String>) -> Self {
        Self {
            transport: Some(transport),
            model: model.into(),
        }
    }

    pub fn offline() -> Self {
        Self {
            transport: None,
            model: String::new(),
        }
    }

    /// Online generator over HTTPS when an API key is available, offline otherwise.
    pub fn from_config(config: &QuestionServiceConfig) -> Self {
        match UreqTransport::from_config(config) {
            Ok(transport) => {
                log::info!("Question service: {} ({})", config.api_url, config.model);
                Self::new(Arc::new(transport), config.model.clone())
            }
            Err(e) => {
                log::info!("Question service unavailable ({}), serving fallback questions", e);
                Self::offline()
            }
        }
    }

    pub fn is_online(&self) -> bool {
        self.transport.is_some()
    }

    pub fn build_request(&self, tier: DifficultyTier) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(tier.prompt())],
        }
    }

    /// Start generating a question for `tier` without blocking.
    pub fn generate(&self, tier: DifficultyTier) -> PendingQuestion {
        let Some(transport) = self.transport.clone() else {
            return PendingQuestion::ready(tier, fallback_question(tier));
        };

        let request = self.build_request(tier);
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let spawned = thread::Builder::new()
            .name("question-worker".into())
            .spawn(move || {
                let question = resolve(transport.as_ref(), &request, tier);
                // The game may have been reloaded; nobody listening is fine.
                let _ = sender.send(question);
            });

        match spawned {
            Ok(_) => PendingQuestion { tier, receiver },
            Err(e) => {
                log::warn!("Failed to start question worker: {}, using fallback", e);
                PendingQuestion::ready(tier, fallback_question(tier))
            }
        }
    }

    /// Same as [`generate`](Self::generate) but on the calling thread.
    pub fn generate_blocking(&self, tier: DifficultyTier) -> Question {
        match &self.transport {
            Some(transport) => resolve(transport.as_ref(), &self.build_request(tier), tier),
            None => fallback_question(tier),
        }
    }
}

fn resolve(transport: &dyn ChatTransport, request: &ChatRequest, tier: DifficultyTier) -> Question {
    match transport.complete(request).and_then(|body| parse_reply(&body)) {
        Ok(question) => {
            log::debug!("Generated {:?} question: {}", tier, question.prompt);
            question
        }
        Err(e) => {
            log::warn!("Question generation failed: {}, using {:?} fallback", e, tier);
            fallback_question(tier)
        }
    }
}

/// Parse a chat-completion reply body into a usable question.
pub fn parse_reply(body: &str) -> Result<Question, QuestionError> {
    let response: ChatResponse = serde_json::from_str(body)?;
    let content = response.first_content()?;
    let object = extract_json_object(content)
        .ok_or_else(|| QuestionError::NoJsonObject(content.to_string()))?;
    let question: Question = serde_json::from_str(object)?;
    question.validate()?;
    Ok(question)
}

/// Substring from the first `{` to the last `}`, newlines included.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replies with a scripted result and records the requests it saw.
    struct ScriptedTransport {
        reply: Result<String, u16>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedTransport {
        fn replying(content: &str) -> Self {
            let body = serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": content}}]
            });
            Self {
                reply: Ok(body.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                reply: Err(status),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl ChatTransport for ScriptedTransport {
        fn complete(&self, request: &ChatRequest) -> Result<String, QuestionError> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(body) => Ok(body.clone()),
                Err(status) if *status == 0 => Err(QuestionError::Transport("connection refused".into())),
                Err(status) => Err(QuestionError::Status { status: *status }),
            }
        }
    }

    #[test]
    fn extracts_object_across_newlines() {
        let text = "Sure! Here it is:\n{\n  \"question\": \"1+1\"\n}\nGood luck {you}";
        assert_eq!(extract_json_object(text), Some("{\n  \"question\": \"1+1\"\n}\nGood luck {you}"));
        assert_eq!(extract_json_object("no braces"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
    }

    #[test]
    fn parses_wrapped_reply() {
        let transport = ScriptedTransport::replying(
            "Here you go:\n{\"question\": \"What is 9 - 4?\", \"answer\": \"5\", \"options\": [\"3\", \"4\", \"5\", \"6\"]}",
        );
        let generator = QuestionGenerator::new(Arc::new(transport), "test-model");
        let question = generator.generate_blocking(DifficultyTier::Easy);
        assert_eq!(question.prompt, "What is 9 - 4?");
        assert_eq!(question.correct_answer, "5");
    }

    #[test]
    fn transport_error_yields_exact_fallback() {
        let generator = QuestionGenerator::new(Arc::new(ScriptedTransport::failing(0)), "m");
        for tier in [DifficultyTier::Easy, DifficultyTier::Medium, DifficultyTier::Hard] {
            assert_eq!(generator.generate_blocking(tier), fallback_question(tier));
        }
    }

    #[test]
    fn bad_status_yields_fallback() {
        let generator = QuestionGenerator::new(Arc::new(ScriptedTransport::failing(500)), "m");
        assert_eq!(
            generator.generate_blocking(DifficultyTier::Medium),
            fallback_question(DifficultyTier::Medium)
        );
    }

    #[test]
    fn malformed_content_yields_fallback() {
        for content in [
            "I cannot help with that.",
            "{\"question\": \"What is 1+1?\", \"answer\": \"2\"}",
            "{\"question\": \"What is 1+1?\", \"answer\": \"2\", \"options\": [\"1\", \"2\"]}",
            "{\"question\": \"\", \"answer\": \"2\", \"options\": [\"1\", \"2\", \"3\", \"4\"]}",
            "{not json at all}",
        ] {
            let generator = QuestionGenerator::new(Arc::new(ScriptedTransport::replying(content)), "m");
            assert_eq!(
                generator.generate_blocking(DifficultyTier::Hard),
                fallback_question(DifficultyTier::Hard),
                "content {content:?} should fall back"
            );
        }
    }

    #[test]
    fn parse_reply_reports_missing_choices() {
        assert!(matches!(parse_reply(r#"{"choices": []}"#), Err(QuestionError::NoChoices)));
        assert!(matches!(parse_reply("<html>"), Err(QuestionError::Decode(_))));
    }

    #[test]
    fn request_carries_system_and_tier_prompt() {
        let transport = Arc::new(ScriptedTransport::failing(0));
        let generator = QuestionGenerator::new(transport.clone(), "gpt-test");
        generator.generate_blocking(DifficultyTier::Medium);

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1, "exactly one attempt, no retry");
        assert_eq!(seen[0].model, "gpt-test");
        assert_eq!(seen[0].messages[0].role, "system");
        assert!(seen[0].messages[0].content.contains("JSON object"));
        assert_eq!(seen[0].messages[1].content, DifficultyTier::Medium.prompt());
    }

    #[test]
    fn worker_delivers_through_channel() {
        let transport = ScriptedTransport::replying(
            "{\"question\": \"What is 6 x 6?\", \"answer\": 36, \"options\": [30, 36, 42, 48]}",
        );
        let generator = QuestionGenerator::new(Arc::new(transport), "m");
        let pending = generator.generate(DifficultyTier::Medium);
        assert_eq!(pending.tier(), DifficultyTier::Medium);
        let question = pending.wait(Duration::from_secs(5));
        assert_eq!(question.correct_answer, "36");
    }

    #[test]
    fn offline_generator_is_ready_immediately() {
        let generator = QuestionGenerator::offline();
        assert!(!generator.is_online());
        let pending = generator.generate(DifficultyTier::Easy);
        assert_eq!(pending.try_take(), Some(fallback_question(DifficultyTier::Easy)));
    }

    #[test]
    fn vanished_worker_yields_fallback() {
        let (sender, receiver) = crossbeam_channel::bounded::<Question>(1);
        drop(sender);
        let pending = PendingQuestion {
            tier: DifficultyTier::Hard,
            receiver,
        };
        assert_eq!(pending.try_take(), Some(fallback_question(DifficultyTier::Hard)));
    }
}

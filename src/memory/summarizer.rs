//! LLM-backed summarization of turns and summaries

use crate::context::models::{Summary, Turn};
use crate::error::Result;
use crate::generation::{GenerationBackend, GenerationRequest};
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str =
    "You are a concise summarizer. Extract key information and compress it efficiently.";

/// Compresses a batch of raw turns, or of existing summaries, into one
/// shorter text via the generation backend.
///
/// The token bound given to the backend is advisory only; callers must
/// re-measure the result before composing it into further budgets.
pub struct Summarizer {
    backend: Arc<dyn GenerationBackend>,
}

impl Summarizer {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// Summarize a batch of raw turns, oldest-first.
    pub async fn summarize_turns(
        &self,
        turns: &[Turn],
        model: &str,
        max_tokens: usize,
    ) -> Result<String> {
        if turns.is_empty() {
            return Ok(String::new());
        }

        let rendered = turns
            .iter()
            .map(Turn::render)
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!(
            "Summarize the following conversation turns into a concise summary. \
            Focus on key facts, decisions, and open items. \
            Keep the summary under {} tokens.\n\n{}",
            max_tokens, rendered
        );

        debug!(turns = turns.len(), max_tokens, "summarizing raw turns");
        self.complete(model, prompt, max_tokens).await
    }

    /// Summarize a batch of existing summaries, oldest-first.
    pub async fn summarize_summaries(
        &self,
        summaries: &[Summary],
        model: &str,
        max_tokens: usize,
    ) -> Result<String> {
        if summaries.is_empty() {
            return Ok(String::new());
        }

        let rendered = summaries
            .iter()
            .enumerate()
            .map(|(i, s)| {
                format!(
                    "Summary {} (messages {}-{}):\n{}",
                    i + 1,
                    s.range_start,
                    s.range_end,
                    s.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        let prompt = format!(
            "Combine the following conversation summaries into a single higher-level summary. \
            Preserve key facts, decisions, and open items. \
            Keep the summary under {} tokens.\n\n{}",
            max_tokens, rendered
        );

        debug!(summaries = summaries.len(), max_tokens, "summarizing summaries");
        self.complete(model, prompt, max_tokens).await
    }

    async fn complete(&self, model: &str, prompt: String, max_tokens: usize) -> Result<String> {
        let completion = self
            .backend
            .generate(GenerationRequest {
                model: model.to_string(),
                system: SYSTEM_PROMPT.to_string(),
                prompt,
                max_tokens: Some(max_tokens),
                temperature: Some(0.3),
            })
            .await?;
        Ok(completion.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::models::{Role, SummaryTier};
    use crate::error::EngineError;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Records prompts and replays canned completions.
    struct RecordingBackend {
        reply: String,
        prompts: Mutex<Vec<GenerationRequest>>,
    }

    impl RecordingBackend {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for RecordingBackend {
        async fn generate(&self, request: GenerationRequest) -> Result<String> {
            self.prompts.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl GenerationBackend for FailingBackend {
        async fn generate(&self, _request: GenerationRequest) -> Result<String> {
            Err(EngineError::Generation("backend unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_turn_prompt_renders_roles_and_bound() {
        let backend = Arc::new(RecordingBackend::new("  the summary  "));
        let summarizer = Summarizer::new(backend.clone());
        let turns = vec![
            Turn::new(Role::User, "what is rust"),
            Turn::new(Role::Assistant, "a systems language"),
        ];

        let result = summarizer
            .summarize_turns(&turns, "test-model", 150)
            .await
            .unwrap();
        assert_eq!(result, "the summary");

        let prompts = backend.prompts.lock().unwrap();
        let req = &prompts[0];
        assert_eq!(req.model, "test-model");
        assert_eq!(req.max_tokens, Some(150));
        assert!(req.prompt.contains("user: what is rust"));
        assert!(req.prompt.contains("assistant: a systems language"));
        assert!(req.prompt.contains("under 150 tokens"));
    }

    #[tokio::test]
    async fn test_summary_prompt_labels_ranges() {
        let backend = Arc::new(RecordingBackend::new("rolled up"));
        let summarizer = Summarizer::new(backend.clone());
        let summaries = vec![
            Summary {
                id: Uuid::new_v4(),
                conversation_id: Uuid::new_v4(),
                tier: SummaryTier::Tier1,
                content: "first block".to_string(),
                range_start: 0,
                range_end: 9,
                created_at: Utc::now(),
            },
            Summary {
                id: Uuid::new_v4(),
                conversation_id: Uuid::new_v4(),
                tier: SummaryTier::Tier1,
                content: "second block".to_string(),
                range_start: 10,
                range_end: 19,
                created_at: Utc::now(),
            },
        ];

        summarizer
            .summarize_summaries(&summaries, "test-model", 200)
            .await
            .unwrap();

        let prompts = backend.prompts.lock().unwrap();
        let prompt = &prompts[0].prompt;
        assert!(prompt.contains("Summary 1 (messages 0-9):\nfirst block"));
        assert!(prompt.contains("Summary 2 (messages 10-19):\nsecond block"));
    }

    #[tokio::test]
    async fn test_empty_input_skips_backend() {
        let summarizer = Summarizer::new(Arc::new(FailingBackend));
        assert_eq!(
            summarizer.summarize_turns(&[], "m", 100).await.unwrap(),
            ""
        );
        assert_eq!(
            summarizer.summarize_summaries(&[], "m", 100).await.unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let summarizer = Summarizer::new(Arc::new(FailingBackend));
        let turns = vec![Turn::new(Role::User, "hello")];
        let err = summarizer
            .summarize_turns(&turns, "m", 100)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}

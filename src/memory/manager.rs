//! Per-conversation summarization state machine
//!
//! The state per conversation is (turn count, tier-1 summaries, tier-2
//! summaries), all read fresh from the store on each invocation. Every
//! `summary_frequency` completed turns one summarization pass runs: at most
//! one tier-1 batch is consumed (a backlog larger than one batch stays
//! pending for the next trigger), then tier-1 summaries beyond the last
//! tier-2 boundary are rolled up once enough have accumulated.

use crate::config::MemoryConfig;
use crate::context::models::{Summary, SummaryTier, Turn};
use crate::context::token_estimator::TokenEstimator;
use crate::error::Result;
use crate::memory::summarizer::Summarizer;
use crate::store::{MemoryStore, NewSummary};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What a summarization pass produced
#[derive(Debug, Default)]
pub struct SummarizationOutcome {
    pub tier1: Option<Summary>,
    pub tier2: Option<Summary>,
    /// True when a generation failure aborted the pass; the underlying raw
    /// turns remain unsummarized and the pass reruns on a later trigger.
    pub skipped: bool,
}

/// Owns turn counting and the two-tier rollup state machine
pub struct MemoryManager {
    store: Arc<dyn MemoryStore>,
    summarizer: Summarizer,
    estimator: Arc<dyn TokenEstimator>,
    config: MemoryConfig,
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl MemoryManager {
    pub fn new(
        store: Arc<dyn MemoryStore>,
        summarizer: Summarizer,
        estimator: Arc<dyn TokenEstimator>,
        config: MemoryConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            summarizer,
            estimator,
            config,
            locks: DashMap::new(),
        })
    }

    /// Advance the turn counter and run the summarization check, serialized
    /// per conversation. Generation failures are logged and swallowed so the
    /// chat turn that triggered them still completes; store failures
    /// propagate.
    pub async fn process_completed_turn(
        &self,
        conversation_id: Uuid,
    ) -> Result<SummarizationOutcome> {
        let lock = {
            let entry = self
                .locks
                .entry(conversation_id)
                .or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };
        let _guard = lock.lock().await;

        self.increment_turn(conversation_id).await?;
        match self.check_and_summarize(conversation_id).await {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_retryable() => {
                warn!(%conversation_id, error = %err, "summarization pass skipped");
                Ok(SummarizationOutcome {
                    skipped: true,
                    ..Default::default()
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Read-modify-write the turn counter. Callers must serialize per
    /// conversation (see `process_completed_turn`); two concurrent writers
    /// would lose updates.
    pub async fn increment_turn(&self, conversation_id: Uuid) -> Result<u64> {
        let conversation = self.store.get_conversation(conversation_id).await?;
        let new_count = conversation.turn_count + 1;
        self.store
            .update_turn_count(conversation_id, new_count)
            .await?;
        Ok(new_count)
    }

    /// Run one summarization pass if the turn counter is a positive multiple
    /// of `summary_frequency`; otherwise a no-op.
    pub async fn check_and_summarize(
        &self,
        conversation_id: Uuid,
    ) -> Result<SummarizationOutcome> {
        let conversation = self.store.get_conversation(conversation_id).await?;
        if conversation.turn_count == 0
            || conversation.turn_count % self.config.summary_frequency != 0
        {
            return Ok(SummarizationOutcome::default());
        }

        debug!(
            %conversation_id,
            turn_count = conversation.turn_count,
            "summarization pass triggered"
        );

        let tier1 = self.rollup_tier1(conversation_id).await?;
        let tier2 = self.rollup_tier2(conversation_id).await?;
        Ok(SummarizationOutcome {
            tier1,
            tier2,
            skipped: false,
        })
    }

    /// Consume the oldest full batch of unsummarized raw turns, if one exists.
    async fn rollup_tier1(&self, conversation_id: Uuid) -> Result<Option<Summary>> {
        let turns = self.store.get_turns(conversation_id).await?;
        let existing = self
            .store
            .get_summaries_by_tier(conversation_id, SummaryTier::Tier1)
            .await?;
        let next_start = existing
            .iter()
            .map(|s| s.range_end + 1)
            .max()
            .unwrap_or(0);

        let unsummarized: &[Turn] = if next_start < turns.len() {
            &turns[next_start..]
        } else {
            &[]
        };
        let batch_size = self.config.messages_per_summary;
        if unsummarized.len() < batch_size {
            debug!(
                %conversation_id,
                pending = unsummarized.len(),
                batch_size,
                "not enough unsummarized turns"
            );
            return Ok(None);
        }

        // Only the first batch is consumed this pass; anything beyond it
        // stays pending for the next trigger.
        let batch = &unsummarized[..batch_size];
        let content = self
            .summarizer
            .summarize_turns(batch, &self.config.model, self.config.summary_max_tokens)
            .await?;
        // The backend's length bound is advisory; measure what came back.
        let measured = self.estimator.estimate(&content);

        let summary = self
            .store
            .create_summary(NewSummary {
                conversation_id,
                tier: SummaryTier::Tier1,
                content,
                range_start: next_start,
                range_end: next_start + batch_size - 1,
            })
            .await?;
        info!(
            %conversation_id,
            range_start = summary.range_start,
            range_end = summary.range_end,
            tokens = measured,
            "tier-1 summary created"
        );
        Ok(Some(summary))
    }

    /// Roll accumulated tier-1 summaries beyond the last tier-2 boundary
    /// into one tier-2 summary, if enough have accumulated.
    async fn rollup_tier2(&self, conversation_id: Uuid) -> Result<Option<Summary>> {
        let mut tier1 = self
            .store
            .get_summaries_by_tier(conversation_id, SummaryTier::Tier1)
            .await?;
        tier1.sort_by_key(|s| s.range_start);

        let tier2 = self
            .store
            .get_summaries_by_tier(conversation_id, SummaryTier::Tier2)
            .await?;
        let boundary = tier2.iter().map(|s| s.range_end).max();

        let fresh: Vec<Summary> = tier1
            .into_iter()
            .filter(|s| boundary.map_or(true, |b| s.range_end > b))
            .collect();
        let needed = self.config.tier1_summaries_before_tier2;
        if fresh.len() < needed {
            return Ok(None);
        }

        let batch = &fresh[..needed];
        let content = self
            .summarizer
            .summarize_summaries(batch, &self.config.model, self.config.summary_max_tokens)
            .await?;
        let measured = self.estimator.estimate(&content);

        let summary = self
            .store
            .create_summary(NewSummary {
                conversation_id,
                tier: SummaryTier::Tier2,
                content,
                range_start: batch[0].range_start,
                range_end: batch[needed - 1].range_end,
            })
            .await?;
        info!(
            %conversation_id,
            range_start = summary.range_start,
            range_end = summary.range_end,
            tokens = measured,
            "tier-2 summary created"
        );
        Ok(Some(summary))
    }
}

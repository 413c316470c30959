//! In-memory reference store
//!
//! Backs the engine with a `DashMap` keyed by conversation id. The on-disk
//! persistence format is out of scope; any store honoring the trait contract
//! (ordered turns, range-guarded summary creation, joint deletion) can
//! replace this.

use super::{MemoryStore, NewSummary};
use crate::context::models::{Conversation, Summary, SummaryTier, Turn};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Default)]
struct ConversationRecord {
    turn_count: u64,
    turns: Vec<Turn>,
    summaries: Vec<Summary>,
}

/// DashMap-backed store
#[derive(Default)]
pub struct InMemoryStore {
    conversations: DashMap<Uuid, ConversationRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn create_conversation(&self) -> Result<Conversation> {
        let id = Uuid::new_v4();
        self.conversations.insert(id, ConversationRecord::default());
        debug!(%id, "conversation created");
        Ok(Conversation { id, turn_count: 0 })
    }

    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Conversation> {
        let record = self
            .conversations
            .get(&conversation_id)
            .ok_or(EngineError::ConversationNotFound(conversation_id))?;
        Ok(Conversation {
            id: conversation_id,
            turn_count: record.turn_count,
        })
    }

    async fn update_turn_count(&self, conversation_id: Uuid, turn_count: u64) -> Result<()> {
        let mut record = self
            .conversations
            .get_mut(&conversation_id)
            .ok_or(EngineError::ConversationNotFound(conversation_id))?;
        record.turn_count = turn_count;
        Ok(())
    }

    async fn append_turn(&self, conversation_id: Uuid, turn: Turn) -> Result<()> {
        let mut record = self
            .conversations
            .get_mut(&conversation_id)
            .ok_or(EngineError::ConversationNotFound(conversation_id))?;
        record.turns.push(turn);
        Ok(())
    }

    async fn get_turns(&self, conversation_id: Uuid) -> Result<Vec<Turn>> {
        let record = self
            .conversations
            .get(&conversation_id)
            .ok_or(EngineError::ConversationNotFound(conversation_id))?;
        Ok(record.turns.clone())
    }

    async fn get_summaries(&self, conversation_id: Uuid) -> Result<Vec<Summary>> {
        let record = self
            .conversations
            .get(&conversation_id)
            .ok_or(EngineError::ConversationNotFound(conversation_id))?;
        Ok(record.summaries.clone())
    }

    async fn get_summaries_by_tier(
        &self,
        conversation_id: Uuid,
        tier: SummaryTier,
    ) -> Result<Vec<Summary>> {
        let record = self
            .conversations
            .get(&conversation_id)
            .ok_or(EngineError::ConversationNotFound(conversation_id))?;
        Ok(record
            .summaries
            .iter()
            .filter(|s| s.tier == tier)
            .cloned()
            .collect())
    }

    async fn create_summary(&self, summary: NewSummary) -> Result<Summary> {
        let mut record = self
            .conversations
            .get_mut(&summary.conversation_id)
            .ok_or(EngineError::ConversationNotFound(summary.conversation_id))?;

        // Summary creation is keyed by range: an overlapping range at the
        // same tier means a pass ran twice or raced, and is rejected.
        let collision = record.summaries.iter().any(|s| {
            s.tier == summary.tier
                && s.range_start <= summary.range_end
                && summary.range_start <= s.range_end
        });
        if collision {
            return Err(EngineError::DuplicateSummaryRange {
                tier: summary.tier.as_u8(),
                start: summary.range_start,
                end: summary.range_end,
            });
        }

        let stored = Summary {
            id: Uuid::new_v4(),
            conversation_id: summary.conversation_id,
            tier: summary.tier,
            content: summary.content,
            range_start: summary.range_start,
            range_end: summary.range_end,
            created_at: Utc::now(),
        };
        debug!(
            conversation_id = %stored.conversation_id,
            tier = stored.tier.as_u8(),
            range_start = stored.range_start,
            range_end = stored.range_end,
            "summary recorded"
        );
        record.summaries.push(stored.clone());
        Ok(stored)
    }

    async fn clear_conversation(&self, conversation_id: Uuid) -> Result<()> {
        let mut record = self
            .conversations
            .get_mut(&conversation_id)
            .ok_or(EngineError::ConversationNotFound(conversation_id))?;
        record.turns.clear();
        record.summaries.clear();
        record.turn_count = 0;
        debug!(%conversation_id, "conversation history cleared");
        Ok(())
    }
}

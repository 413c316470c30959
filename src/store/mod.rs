//! Persistent store seam
//!
//! All engine state lives behind this trait and is read fresh on each
//! invocation; the engine holds no conversation state in memory.

pub mod memory;

use crate::context::models::{Conversation, Summary, SummaryTier, Turn};
use crate::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub use memory::InMemoryStore;

/// Fields for a summary about to be recorded
#[derive(Debug, Clone)]
pub struct NewSummary {
    pub conversation_id: Uuid,
    pub tier: SummaryTier,
    pub content: String,
    pub range_start: usize,
    pub range_end: usize,
}

/// Conversation, turn, and summary persistence
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn create_conversation(&self) -> Result<Conversation>;

    async fn get_conversation(&self, conversation_id: Uuid) -> Result<Conversation>;

    async fn update_turn_count(&self, conversation_id: Uuid, turn_count: u64) -> Result<()>;

    async fn append_turn(&self, conversation_id: Uuid, turn: Turn) -> Result<()>;

    /// Turns in creation order; the vec index is the raw message index
    async fn get_turns(&self, conversation_id: Uuid) -> Result<Vec<Turn>>;

    async fn get_summaries(&self, conversation_id: Uuid) -> Result<Vec<Summary>>;

    async fn get_summaries_by_tier(
        &self,
        conversation_id: Uuid,
        tier: SummaryTier,
    ) -> Result<Vec<Summary>>;

    /// Record a summary. Must reject a range that collides with an existing
    /// summary of the same tier, so an erroneously repeated summarization
    /// pass cannot duplicate state.
    async fn create_summary(&self, summary: NewSummary) -> Result<Summary>;

    /// Delete the conversation's turns and summaries together and reset the
    /// turn counter. Summaries reference raw message indices, so they must
    /// never outlive the messages they cover.
    async fn clear_conversation(&self, conversation_id: Uuid) -> Result<()>;
}

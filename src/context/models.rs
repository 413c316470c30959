//! Data models for conversation memory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Speaker of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One message in a conversation
///
/// Immutable once created. Position in the store's creation order is the raw
/// message index, the coordinate system summary ranges are expressed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Citation records attached by retrieval; opaque to the engine
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            model: None,
            citations: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Render as it appears in prompts and assembled context
    pub fn render(&self) -> String {
        format!("{}: {}", self.role, self.content)
    }
}

/// Summary granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SummaryTier {
    /// Rollup of raw turns
    Tier1,
    /// Rollup of tier-1 summaries
    Tier2,
}

impl SummaryTier {
    pub fn as_u8(self) -> u8 {
        match self {
            SummaryTier::Tier1 => 1,
            SummaryTier::Tier2 => 2,
        }
    }
}

/// Compressed text covering an inclusive range of raw message indices
///
/// Append-only: never edited, only superseded by accumulation of newer
/// summaries. Tier-1 ranges are contiguous and non-overlapping per
/// conversation; a tier-2 range covers a contiguous block of tier-1 ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub tier: SummaryTier,
    pub content: String,
    pub range_start: usize,
    pub range_end: usize,
    pub created_at: DateTime<Utc>,
}

/// Conversation metadata owned by the persistent store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    /// Completed assistant responses so far
    pub turn_count: u64,
}

/// Result of bounded context assembly
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledContext {
    /// The single bounded string passed to the generation backend
    pub full_context: String,
    /// Effective tier-2 summary, if one was included
    pub tier2_summary: Option<Summary>,
    /// Tier-1 summaries actually included, oldest-first
    pub tier1_summaries: Vec<Summary>,
    /// Raw turns included verbatim, oldest-first
    pub recent_turns: Vec<Turn>,
}

//! Hierarchical conversation memory with bounded context assembly
//!
//! Keeps a growing conversation inside a fixed prompt-token budget by
//! compressing raw history into two tiers of summaries and assembling, for
//! every model call, a single bounded context string from compressed memory,
//! recent raw turns, and a caller-supplied preamble.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod generation;
pub mod memory;
pub mod store;

pub use config::{ContextBudget, EngineConfig, GenerationConfig, MemoryConfig};
pub use context::{
    AssembledContext, ContextAssembler, Conversation, Role, Summary, SummaryTier, TokenEstimator,
    Turn, WordBasedEstimator,
};
pub use engine::MemoryEngine;
pub use error::{EngineError, Result};
pub use generation::{GenerationBackend, GenerationRequest, HttpGenerationClient};
pub use memory::{MemoryManager, SummarizationOutcome, Summarizer};
pub use store::{InMemoryStore, MemoryStore, NewSummary};

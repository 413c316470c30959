//! Hierarchical summarization of conversation history

pub mod manager;
pub mod summarizer;

pub use manager::{MemoryManager, SummarizationOutcome};
pub use summarizer::Summarizer;

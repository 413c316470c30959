//! Context assembly with token budget enforcement

pub mod assembler;
pub mod models;
pub mod token_estimator;

pub use assembler::ContextAssembler;
pub use models::{AssembledContext, Conversation, Role, Summary, SummaryTier, Turn};
pub use token_estimator::{TokenEstimator, WordBasedEstimator};

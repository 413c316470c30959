//! Error taxonomy for the memory engine

use thiserror::Error;
use uuid::Uuid;

/// Engine errors
///
/// `Generation` failures are retryable: the summarization pass that hit them
/// is skipped with state unchanged, and the same raw turns trigger again on a
/// later pass. Store failures must propagate; swallowing them risks
/// duplicate or conflicting summary ranges on retry.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("generation backend error: {0}")]
    Generation(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("conversation not found: {0}")]
    ConversationNotFound(Uuid),

    #[error("duplicate summary range for tier {tier}: [{start}, {end}]")]
    DuplicateSummaryRange { tier: u8, start: usize, end: usize },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    /// True for failures that leave summarization state unchanged and safe
    /// to retry on the next triggering turn.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Generation(_))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_errors_are_retryable() {
        assert!(EngineError::Generation("timeout".to_string()).is_retryable());
        assert!(!EngineError::Store("disk full".to_string()).is_retryable());
        assert!(!EngineError::Configuration("bad budget".to_string()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::DuplicateSummaryRange {
            tier: 1,
            start: 0,
            end: 9,
        };
        assert_eq!(err.to_string(), "duplicate summary range for tier 1: [0, 9]");
    }
}

//! Engine configuration
//!
//! All knobs are plain scalars with documented defaults. Validation is
//! fail-fast: a non-positive batch size or token budget would produce
//! nonsensical ranges or truncation, so it is rejected before first use.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Summarization state-machine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Completed turns between summarization checks
    pub summary_frequency: u64,
    /// Raw turns consumed per tier-1 summary
    pub messages_per_summary: usize,
    /// Tier-1 summaries consumed per tier-2 rollup
    pub tier1_summaries_before_tier2: usize,
    /// Model used for summarization calls
    pub model: String,
    /// Soft token bound passed to the backend for each summary (advisory)
    pub summary_max_tokens: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            summary_frequency: 10,
            messages_per_summary: 10,
            tier1_summaries_before_tier2: 5,
            model: "llama3.2:1b".to_string(),
            summary_max_tokens: 200,
        }
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.summary_frequency == 0 {
            return Err(EngineError::Configuration(
                "summary_frequency must be positive".to_string(),
            ));
        }
        if self.messages_per_summary == 0 {
            return Err(EngineError::Configuration(
                "messages_per_summary must be positive".to_string(),
            ));
        }
        if self.tier1_summaries_before_tier2 == 0 {
            return Err(EngineError::Configuration(
                "tier1_summaries_before_tier2 must be positive".to_string(),
            ));
        }
        if self.model.is_empty() {
            return Err(EngineError::Configuration(
                "summarization model must be set".to_string(),
            ));
        }
        if self.summary_max_tokens == 0 {
            return Err(EngineError::Configuration(
                "summary_max_tokens must be positive".to_string(),
            ));
        }
        if self.summary_frequency > self.messages_per_summary as u64 {
            // Raw turns then accumulate faster than one batch per pass
            // consumes them; the backlog stays pending across passes.
            warn!(
                summary_frequency = self.summary_frequency,
                messages_per_summary = self.messages_per_summary,
                "summary_frequency exceeds messages_per_summary; unsummarized backlog will lag"
            );
        }
        Ok(())
    }
}

/// Context assembly budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBudget {
    /// Most-recent raw turns always included verbatim
    pub raw_message_count: usize,
    /// Maximum estimated tokens for the assembled context
    pub token_budget: usize,
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self {
            raw_message_count: 10,
            token_budget: 4000,
        }
    }
}

impl ContextBudget {
    pub fn validate(&self) -> Result<()> {
        if self.token_budget == 0 {
            return Err(EngineError::Configuration(
                "token_budget must be positive".to_string(),
            ));
        }
        if self.raw_message_count == 0 {
            return Err(EngineError::Configuration(
                "raw_message_count must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Generation backend endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(EngineError::Configuration(
                "generation endpoint must be set".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(EngineError::Configuration(
                "generation timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub context: ContextBudget,
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl EngineConfig {
    /// Load from a TOML file layered with `MEMORY_ENGINE_*` environment
    /// variables (e.g. `MEMORY_ENGINE_MEMORY__MODEL`).
    pub fn load(path: &str) -> Result<Self> {
        let cfg: EngineConfig = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("MEMORY_ENGINE").separator("__"))
            .build()
            .map_err(|e| EngineError::Configuration(e.to_string()))?
            .try_deserialize()
            .map_err(|e| EngineError::Configuration(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.memory.validate()?;
        self.context.validate()?;
        self.generation.validate()?;
        Ok(())
    }
}

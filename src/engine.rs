//! Engine facade wiring the store, summarizer, and assembler
//!
//! One instance per process, built from explicit dependencies rather than
//! module-scope singletons. Per request the flow is: persist the user turn
//! (caller), `assemble_context`, call the generation backend (caller),
//! persist the assistant turn (caller), `complete_turn`.

use crate::config::EngineConfig;
use crate::context::models::AssembledContext;
use crate::context::token_estimator::{TokenEstimator, WordBasedEstimator};
use crate::context::ContextAssembler;
use crate::error::Result;
use crate::generation::GenerationBackend;
use crate::memory::{MemoryManager, SummarizationOutcome, Summarizer};
use crate::store::MemoryStore;
use std::sync::Arc;
use uuid::Uuid;

/// Hierarchical memory and bounded context assembly engine
pub struct MemoryEngine {
    store: Arc<dyn MemoryStore>,
    manager: MemoryManager,
    assembler: ContextAssembler,
    config: EngineConfig,
}

impl MemoryEngine {
    /// Build an engine with the default word-based token estimator.
    pub fn new(
        store: Arc<dyn MemoryStore>,
        backend: Arc<dyn GenerationBackend>,
        config: EngineConfig,
    ) -> Result<Self> {
        Self::with_estimator(store, backend, Arc::new(WordBasedEstimator::default()), config)
    }

    pub fn with_estimator(
        store: Arc<dyn MemoryStore>,
        backend: Arc<dyn GenerationBackend>,
        estimator: Arc<dyn TokenEstimator>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let manager = MemoryManager::new(
            Arc::clone(&store),
            Summarizer::new(backend),
            Arc::clone(&estimator),
            config.memory.clone(),
        )?;
        let assembler = ContextAssembler::new(estimator);
        Ok(Self {
            store,
            manager,
            assembler,
            config,
        })
    }

    /// Assemble the bounded context for the next generation call. History
    /// and summaries are read fresh from the store; the base preamble may
    /// already include retrieved passages and is passed through opaquely.
    pub async fn assemble_context(
        &self,
        conversation_id: Uuid,
        base_preamble: &str,
    ) -> Result<AssembledContext> {
        let turns = self.store.get_turns(conversation_id).await?;
        let summaries = self.store.get_summaries(conversation_id).await?;
        Ok(self
            .assembler
            .build_context(&turns, &summaries, base_preamble, &self.config.context))
    }

    /// Record a completed assistant turn: advance the counter and run the
    /// summarization check, serialized per conversation. Generation failures
    /// are isolated from the primary response path.
    pub async fn complete_turn(&self, conversation_id: Uuid) -> Result<SummarizationOutcome> {
        self.manager.process_completed_turn(conversation_id).await
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

//! End-to-end tests for the memory engine
//!
//! Drives the full request flow (persist turns, assemble context, complete
//! turn) against the in-memory store and a scripted generation backend.

use async_trait::async_trait;
use memory_engine::{
    ContextBudget, EngineConfig, EngineError, GenerationBackend, GenerationRequest, InMemoryStore,
    MemoryConfig, MemoryEngine, MemoryStore, Result, Role, SummaryTier, TokenEstimator, Turn,
    WordBasedEstimator,
};
use std::sync::Arc;

/// Backend replying with a fixed-size summary regardless of input.
struct StubBackend {
    reply: String,
}

impl StubBackend {
    fn with_words(count: usize) -> Self {
        Self {
            reply: vec!["word"; count].join(" "),
        }
    }
}

#[async_trait]
impl GenerationBackend for StubBackend {
    async fn generate(&self, _request: GenerationRequest) -> Result<String> {
        Ok(self.reply.clone())
    }
}

struct FailingBackend;

#[async_trait]
impl GenerationBackend for FailingBackend {
    async fn generate(&self, _request: GenerationRequest) -> Result<String> {
        Err(EngineError::Generation("unreachable".to_string()))
    }
}

fn trace_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn small_config() -> EngineConfig {
    EngineConfig {
        memory: MemoryConfig {
            summary_frequency: 2,
            messages_per_summary: 4,
            tier1_summaries_before_tier2: 2,
            ..Default::default()
        },
        context: ContextBudget {
            raw_message_count: 4,
            token_budget: 4000,
        },
        ..Default::default()
    }
}

async fn run_exchange(store: &InMemoryStore, engine: &MemoryEngine, id: uuid::Uuid, n: usize) {
    store
        .append_turn(id, Turn::new(Role::User, format!("question {}", n)))
        .await
        .unwrap();
    store
        .append_turn(
            id,
            Turn::new(Role::Assistant, format!("answer {}", n)).with_model("llama3.2:1b"),
        )
        .await
        .unwrap();
    engine.complete_turn(id).await.unwrap();
}

#[tokio::test]
async fn test_summaries_accumulate_over_conversation() {
    trace_init();
    let store = Arc::new(InMemoryStore::new());
    let engine = MemoryEngine::new(
        store.clone(),
        Arc::new(StubBackend::with_words(12)),
        small_config(),
    )
    .unwrap();
    let conv = store.create_conversation().await.unwrap();

    // 8 exchanges = 16 raw turns, 8 completed turns. With freq=2 and
    // batch=4, passes at counts 2/4/6/8 consume [0,3],[4,7],[8,11],[12,15];
    // tier-2 (threshold 2) rolls up at the second and fourth tier-1.
    for n in 0..8 {
        run_exchange(&store, &engine, conv.id, n).await;
    }

    let mut tier1 = store
        .get_summaries_by_tier(conv.id, SummaryTier::Tier1)
        .await
        .unwrap();
    tier1.sort_by_key(|s| s.range_start);
    let ranges: Vec<(usize, usize)> = tier1.iter().map(|s| (s.range_start, s.range_end)).collect();
    assert_eq!(ranges, vec![(0, 3), (4, 7), (8, 11), (12, 15)]);

    let mut tier2 = store
        .get_summaries_by_tier(conv.id, SummaryTier::Tier2)
        .await
        .unwrap();
    tier2.sort_by_key(|s| s.range_start);
    let ranges: Vec<(usize, usize)> = tier2.iter().map(|s| (s.range_start, s.range_end)).collect();
    assert_eq!(ranges, vec![(0, 7), (8, 15)]);
}

#[tokio::test]
async fn test_assembled_context_reflects_fresh_state() {
    let store = Arc::new(InMemoryStore::new());
    let engine = MemoryEngine::new(
        store.clone(),
        Arc::new(StubBackend::with_words(12)),
        small_config(),
    )
    .unwrap();
    let conv = store.create_conversation().await.unwrap();

    for n in 0..2 {
        run_exchange(&store, &engine, conv.id, n).await;
    }

    let ctx = engine
        .assemble_context(conv.id, "You are a helpful assistant.")
        .await
        .unwrap();
    // One tier-1 summary exists by now and the recent window holds the last
    // 4 raw turns.
    assert_eq!(ctx.tier1_summaries.len(), 1);
    assert_eq!(ctx.recent_turns.len(), 4);
    assert!(ctx.full_context.starts_with("You are a helpful assistant."));
    assert!(ctx.full_context.contains("Summary 1 (messages 0-3):"));
    assert!(ctx.full_context.ends_with("assistant: answer 1"));
}

#[tokio::test]
async fn test_context_stays_within_budget_under_pressure() {
    trace_init();
    let estimator = WordBasedEstimator::default();
    let store = Arc::new(InMemoryStore::new());
    let mut config = small_config();
    config.context.token_budget = 120;
    let engine = MemoryEngine::new(
        store.clone(),
        // Large summaries so truncation has something to drop.
        Arc::new(StubBackend::with_words(60)),
        config,
    )
    .unwrap();
    let conv = store.create_conversation().await.unwrap();

    for n in 0..8 {
        run_exchange(&store, &engine, conv.id, n).await;
    }

    let preamble = "Answer briefly.";
    let ctx = engine.assemble_context(conv.id, preamble).await.unwrap();

    let recent_rendered = ctx
        .recent_turns
        .iter()
        .map(|t| t.render())
        .collect::<Vec<_>>()
        .join("\n");
    let floor = estimator.estimate(preamble) + estimator.estimate(&recent_rendered);
    assert!(floor <= 120, "test precondition: preamble + recent fit");
    assert!(
        estimator.estimate(&ctx.full_context) <= 120,
        "assembled context exceeds budget"
    );
    // Recent turns are never dropped.
    assert_eq!(ctx.recent_turns.len(), 4);
}

#[tokio::test]
async fn test_backend_outage_does_not_fail_the_turn() {
    let store = Arc::new(InMemoryStore::new());
    let engine = MemoryEngine::new(store.clone(), Arc::new(FailingBackend), small_config()).unwrap();
    let conv = store.create_conversation().await.unwrap();

    for n in 0..2 {
        store
            .append_turn(conv.id, Turn::new(Role::User, format!("q {}", n)))
            .await
            .unwrap();
        store
            .append_turn(conv.id, Turn::new(Role::Assistant, format!("a {}", n)))
            .await
            .unwrap();
        // Must not error even when every summarization attempt fails.
        let outcome = engine.complete_turn(conv.id).await.unwrap();
        assert!(outcome.tier1.is_none());
    }

    assert_eq!(store.get_conversation(conv.id).await.unwrap().turn_count, 2);
    assert!(store.get_summaries(conv.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clearing_history_removes_summaries() {
    let store = Arc::new(InMemoryStore::new());
    let engine = MemoryEngine::new(
        store.clone(),
        Arc::new(StubBackend::with_words(10)),
        small_config(),
    )
    .unwrap();
    let conv = store.create_conversation().await.unwrap();

    for n in 0..4 {
        run_exchange(&store, &engine, conv.id, n).await;
    }
    assert!(!store.get_summaries(conv.id).await.unwrap().is_empty());

    store.clear_conversation(conv.id).await.unwrap();
    assert!(store.get_turns(conv.id).await.unwrap().is_empty());
    assert!(store.get_summaries(conv.id).await.unwrap().is_empty());

    // A fresh history starts the machine over without stale ranges.
    for n in 0..2 {
        run_exchange(&store, &engine, conv.id, n).await;
    }
    let tier1 = store
        .get_summaries_by_tier(conv.id, SummaryTier::Tier1)
        .await
        .unwrap();
    assert_eq!(tier1.len(), 1);
    assert_eq!((tier1[0].range_start, tier1[0].range_end), (0, 3));
}

#[tokio::test]
async fn test_invalid_config_rejected_at_construction() {
    let store = Arc::new(InMemoryStore::new());
    let mut config = small_config();
    config.context.token_budget = 0;
    let err = MemoryEngine::new(store, Arc::new(StubBackend::with_words(5)), config)
        .err()
        .unwrap();
    assert!(matches!(err, EngineError::Configuration(_)));
}

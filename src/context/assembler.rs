//! Bounded context assembly with deterministic truncation
//!
//! Composes the single context string handed to the generation backend from
//! a caller-supplied preamble, the effective tier-2 summary, tier-1
//! summaries, and the most recent raw turns, then enforces the token budget
//! by dropping summary material, never the preamble or recent turns.

use super::models::{AssembledContext, Summary, SummaryTier, Turn};
use super::token_estimator::TokenEstimator;
use crate::config::ContextBudget;
use std::sync::Arc;
use tracing::{debug, warn};

/// Fraction of the remaining budget a tier-2 summary may occupy
const TIER2_REMAINING_RATIO: f64 = 0.3;
/// Fraction of the remaining budget tier-1 summaries may occupy together
const TIER1_REMAINING_RATIO: f64 = 0.5;

/// Assembles bounded context strings
///
/// Never fails for well-formed input; under token pressure it degrades by
/// dropping summary sections, oldest material first.
pub struct ContextAssembler {
    estimator: Arc<dyn TokenEstimator>,
}

impl ContextAssembler {
    pub fn new(estimator: Arc<dyn TokenEstimator>) -> Self {
        Self { estimator }
    }

    /// Build the bounded context for one generation call.
    ///
    /// Section order is always preamble, summary material (if any), recent
    /// turns. The preamble and the recent-turns block are never dropped or
    /// shortened; when the budget cannot hold everything, the tier-2 summary
    /// is preferred if it is cheap enough, otherwise as many of the most
    /// recent tier-1 summaries as fit are kept.
    pub fn build_context(
        &self,
        turns: &[Turn],
        summaries: &[Summary],
        base_preamble: &str,
        budget: &ContextBudget,
    ) -> AssembledContext {
        let mut tier1: Vec<Summary> = summaries
            .iter()
            .filter(|s| s.tier == SummaryTier::Tier1)
            .cloned()
            .collect();
        tier1.sort_by_key(|s| s.range_start);

        let mut tier2: Vec<Summary> = summaries
            .iter()
            .filter(|s| s.tier == SummaryTier::Tier2)
            .cloned()
            .collect();
        tier2.sort_by_key(|s| s.range_start);
        // Older tier-2 summaries are superseded; only the most recent is used.
        let effective_tier2 = tier2.last().cloned();

        let recent_start = turns.len().saturating_sub(budget.raw_message_count);
        let recent: Vec<Turn> = turns[recent_start..].to_vec();
        let recent_block = render_recent(&recent);

        // Untruncated assembly first
        let full = join_sections(
            base_preamble,
            effective_tier2.as_ref().map(render_tier2).as_deref(),
            &render_tier1_blocks(&tier1),
            &recent_block,
        );
        let full_tokens = self.estimator.estimate(&full);
        if full_tokens <= budget.token_budget {
            debug!(tokens = full_tokens, budget = budget.token_budget, "context fits untruncated");
            return AssembledContext {
                full_context: full,
                tier2_summary: effective_tier2,
                tier1_summaries: tier1,
                recent_turns: recent,
            };
        }

        warn!(
            tokens = full_tokens,
            budget = budget.token_budget,
            "context exceeds budget, truncating summary material"
        );

        let preamble_tokens = self.estimator.estimate(base_preamble);
        let recent_tokens = self.estimator.estimate(&recent_block);
        let remaining =
            budget.token_budget as i64 - preamble_tokens as i64 - recent_tokens as i64;

        if remaining <= 0 {
            // Preamble and recent turns alone exceed the budget; summaries
            // are dropped entirely and the minimum is returned.
            debug!(remaining, "no room for summaries");
            return AssembledContext {
                full_context: join_sections(base_preamble, None, &[], &recent_block),
                tier2_summary: None,
                tier1_summaries: Vec::new(),
                recent_turns: recent,
            };
        }
        let remaining = remaining as usize;

        // Tier-2 and tier-1 are mutually exclusive here, tier-2 first.
        if let Some(t2) = &effective_tier2 {
            let block = render_tier2(t2);
            let cost = self.estimator.estimate(&block);
            if (cost as f64) < remaining as f64 * TIER2_REMAINING_RATIO {
                debug!(cost, remaining, "keeping tier-2 summary");
                return AssembledContext {
                    full_context: join_sections(base_preamble, Some(&block), &[], &recent_block),
                    tier2_summary: effective_tier2,
                    tier1_summaries: Vec::new(),
                    recent_turns: recent,
                };
            }
        }

        // Fit a suffix of the tier-1 list, most recent backward, stopping at
        // the first summary that would overflow the share.
        let limit = remaining as f64 * TIER1_REMAINING_RATIO;
        let mut kept: Vec<Summary> = Vec::new();
        let mut used = 0usize;
        for summary in tier1.iter().rev() {
            let cost = self
                .estimator
                .estimate(&render_tier1_block(summary, 1));
            if (used + cost) as f64 > limit {
                break;
            }
            used += cost;
            kept.push(summary.clone());
        }
        kept.reverse();

        debug!(kept = kept.len(), total = tier1.len(), used, "tier-1 summaries retained");

        AssembledContext {
            full_context: join_sections(
                base_preamble,
                None,
                &render_tier1_blocks(&kept),
                &recent_block,
            ),
            tier2_summary: None,
            tier1_summaries: kept,
            recent_turns: recent,
        }
    }
}

fn render_recent(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(Turn::render)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_tier2(summary: &Summary) -> String {
    format!("Summary of earlier conversation:\n{}", summary.content)
}

fn render_tier1_block(summary: &Summary, ordinal: usize) -> String {
    format!(
        "Summary {} (messages {}-{}):\n{}",
        ordinal, summary.range_start, summary.range_end, summary.content
    )
}

fn render_tier1_blocks(summaries: &[Summary]) -> Vec<String> {
    summaries
        .iter()
        .enumerate()
        .map(|(i, s)| render_tier1_block(s, i + 1))
        .collect()
}

fn join_sections(
    preamble: &str,
    tier2_block: Option<&str>,
    tier1_blocks: &[String],
    recent_block: &str,
) -> String {
    let mut sections: Vec<&str> = Vec::new();
    if !preamble.is_empty() {
        sections.push(preamble);
    }
    if let Some(block) = tier2_block {
        sections.push(block);
    }
    for block in tier1_blocks {
        sections.push(block);
    }
    if !recent_block.is_empty() {
        sections.push(recent_block);
    }
    sections.join("\n\n")
}

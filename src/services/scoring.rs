//! Relevance scoring for memory ranking.
//!
//! Computes a deterministic composite score from four weighted
//! factors: the stored base relevance, a linear recency decay, scope
//! proximity to the caller's current bead/epic, and a kind boost.
//! The weights sum to 1.0.

use chrono::Utc;

use crate::models::{MemoryEntry, MemoryKind, RankedMemory, ScoreBreakdown, ScoreContext};

/// Days over which the recency boost decays linearly to zero.
pub const RECENCY_DECAY_DAYS: f64 = 30.0;

/// Weight of the stored base relevance.
pub const BASE_RELEVANCE_WEIGHT: f64 = 0.4;

/// Weight of the recency boost.
pub const RECENCY_WEIGHT: f64 = 0.3;

/// Weight of scope proximity.
pub const SCOPE_PROXIMITY_WEIGHT: f64 = 0.2;

/// Weight of the kind boost.
pub const KIND_WEIGHT: f64 = 0.1;

/// Proximity for an exact bead match.
pub const BEAD_MATCH_PROXIMITY: f64 = 1.0;

/// Proximity for an epic match without a bead match.
pub const EPIC_MATCH_PROXIMITY: f64 = 0.7;

/// Proximity for everything else (project-level default).
pub const PROJECT_PROXIMITY: f64 = 0.3;

/// Boost for always-relevant kinds.
pub fn kind_boost(kind: MemoryKind) -> f64 {
    match kind {
        MemoryKind::Constraint => 0.3,
        MemoryKind::Decision => 0.2,
        MemoryKind::Checkpoint => 0.1,
        _ => 0.0,
    }
}

fn recency_boost(entry: &MemoryEntry) -> f64 {
    let days = Utc::now()
        .signed_duration_since(entry.created_at)
        .num_seconds() as f64
        / 86400.0;
    let days = days.max(0.0);
    (1.0 - days / RECENCY_DECAY_DAYS).max(0.0)
}

/// Bead match wins over epic match; the two are never combined.
fn scope_proximity(entry: &MemoryEntry, context: &ScoreContext) -> f64 {
    match (&entry.bead_id, &context.bead_id) {
        (Some(a), Some(b)) if a == b => return BEAD_MATCH_PROXIMITY,
        _ => {}
    }
    match (&entry.epic_id, &context.epic_id) {
        (Some(a), Some(b)) if a == b => EPIC_MATCH_PROXIMITY,
        _ => PROJECT_PROXIMITY,
    }
}

/// Compute the composite relevance score for an entry in the given
/// working context.
pub fn calculate_relevance_score(
    entry: &MemoryEntry,
    context: &ScoreContext,
) -> (f64, ScoreBreakdown) {
    let breakdown = ScoreBreakdown {
        base_relevance: entry.relevance_score,
        recency_boost: recency_boost(entry),
        scope_proximity: scope_proximity(entry, context),
        kind_boost: kind_boost(entry.kind),
    };

    let computed = breakdown.base_relevance * BASE_RELEVANCE_WEIGHT
        + breakdown.recency_boost * RECENCY_WEIGHT
        + breakdown.scope_proximity * SCOPE_PROXIMITY_WEIGHT
        + breakdown.kind_boost * KIND_WEIGHT;

    (computed, breakdown)
}

/// Score every entry and return them sorted by computed score,
/// highest first.
pub fn rank_memories(entries: Vec<MemoryEntry>, context: &ScoreContext) -> Vec<RankedMemory> {
    let mut ranked: Vec<RankedMemory> = entries
        .into_iter()
        .map(|entry| {
            let (computed_score, breakdown) = calculate_relevance_score(&entry, context);
            RankedMemory {
                entry,
                computed_score,
                breakdown,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.computed_score
            .partial_cmp(&a.computed_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    ranked
}

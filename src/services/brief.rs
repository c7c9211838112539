//! Memory brief assembly.
//!
//! Packs an already-ranked memory list into a single markdown blob
//! under a token budget. Greedy single pass: entries that do not fit
//! are counted as truncated and never revisited, constraints are
//! packed before everything else, and the ordering of the input list
//! is trusted as-is (ranking happens upstream).

use crate::config;
use crate::models::{MemoryBrief, MemoryEntry, MemoryKind, RankedMemory};

/// Fixed character-to-token ratio. Approximate on purpose; no
/// tokenizer dependency.
pub const TOKENS_PER_CHAR: f64 = 0.25;

/// First line of every brief.
pub const BRIEF_HEADER: &str = "## Memory Brief";

/// Options for brief assembly.
#[derive(Debug, Clone)]
pub struct BriefOptions {
    /// Token budget for the brief body.
    pub max_tokens: usize,
    /// Pack constraint entries before everything else.
    pub prioritize_constraints: bool,
    /// Append a score line to entries that carry a computed score.
    pub include_score_breakdown: bool,
}

impl Default for BriefOptions {
    fn default() -> Self {
        Self {
            max_tokens: config::config().brief_max_tokens,
            prioritize_constraints: true,
            include_score_breakdown: false,
        }
    }
}

/// Brief input: a memory entry, optionally carrying the score it was
/// ranked with.
#[derive(Debug, Clone)]
pub struct BriefEntry {
    pub entry: MemoryEntry,
    pub computed_score: Option<f64>,
}

impl From<MemoryEntry> for BriefEntry {
    fn from(entry: MemoryEntry) -> Self {
        Self {
            entry,
            computed_score: None,
        }
    }
}

impl From<RankedMemory> for BriefEntry {
    fn from(ranked: RankedMemory) -> Self {
        Self {
            entry: ranked.entry,
            computed_score: Some(ranked.computed_score),
        }
    }
}

/// Estimate the token cost of a piece of text.
pub fn estimate_tokens(text: &str) -> usize {
    (text.len() as f64 * TOKENS_PER_CHAR).ceil() as usize
}

/// Scope tag for an entry heading; bead wins over epic.
fn scope_tag(entry: &MemoryEntry) -> String {
    if let Some(bead_id) = &entry.bead_id {
        format!("bead:{}", bead_id)
    } else if let Some(epic_id) = &entry.epic_id {
        format!("epic:{}", epic_id)
    } else {
        "project".to_string()
    }
}

fn render_entry(item: &BriefEntry, include_score: bool) -> String {
    let entry = &item.entry;
    let mut text = format!(
        "### {} [{}]\n**{}** - {}\n{}",
        entry.title,
        scope_tag(entry),
        entry.kind.as_str(),
        entry.created_at.format("%Y-%m-%d"),
        entry.content,
    );

    if include_score {
        if let Some(score) = item.computed_score {
            text.push_str(&format!("\n_relevance: {:.2}_", score));
        }
    }

    text
}

/// Build a token-budgeted brief from an ordered memory list.
///
/// The truncation footer is appended after inclusion decisions, so the
/// final estimate can slightly exceed the budget when entries were
/// omitted. That slack is part of the contract.
pub fn build_memory_brief(memories: &[BriefEntry], options: &BriefOptions) -> MemoryBrief {
    let mut pieces = vec![BRIEF_HEADER.to_string()];
    let mut running = estimate_tokens(BRIEF_HEADER);
    let mut included = 0usize;
    let mut truncated = 0usize;

    let (constraints, others): (Vec<&BriefEntry>, Vec<&BriefEntry>) =
        if options.prioritize_constraints {
            memories
                .iter()
                .partition(|m| m.entry.kind == MemoryKind::Constraint)
        } else {
            (Vec::new(), memories.iter().collect())
        };

    for item in constraints.into_iter().chain(others) {
        let rendered = render_entry(item, options.include_score_breakdown);
        let cost = estimate_tokens(&rendered);

        if running + cost <= options.max_tokens {
            pieces.push(rendered);
            running += cost;
            included += 1;
        } else {
            truncated += 1;
        }
    }

    if truncated > 0 {
        let footer = format!("_{} additional memories omitted (token budget)_", truncated);
        running += estimate_tokens(&footer);
        pieces.push(footer);
    }

    MemoryBrief {
        text: pieces.join("\n"),
        token_estimate: running,
        included_count: included,
        truncated_count: truncated,
    }
}

//! Memory entry types and retrieval DTOs.
//!
//! Memory entries are the durable knowledge units of the assistant:
//! decisions, constraints, checkpoints and the like, each scoped to a
//! bead (task), an epic (group of tasks), or the whole project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Kinds
// ============================================================================

/// Memory entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Decision,
    Checkpoint,
    Constraint,
    NextStep,
    ActionReport,
    CiNote,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Decision => "decision",
            Self::Checkpoint => "checkpoint",
            Self::Constraint => "constraint",
            Self::NextStep => "next_step",
            Self::ActionReport => "action_report",
            Self::CiNote => "ci_note",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "decision" => Some(Self::Decision),
            "checkpoint" => Some(Self::Checkpoint),
            "constraint" => Some(Self::Constraint),
            "next_step" => Some(Self::NextStep),
            "action_report" => Some(Self::ActionReport),
            "ci_note" => Some(Self::CiNote),
            _ => None,
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Decision,
            Self::Checkpoint,
            Self::Constraint,
            Self::NextStep,
            Self::ActionReport,
            Self::CiNote,
        ]
    }
}

// ============================================================================
// Entries
// ============================================================================

/// A durable memory entry.
///
/// Scope is carried by `bead_id`/`epic_id`: both set means bead-scoped,
/// epic only means epic-scoped, both absent means project-scoped.
/// Entries are never updated in place; they are only soft-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub project_id: String,
    pub bead_id: Option<String>,
    pub epic_id: Option<String>,
    pub session_id: Option<String>,
    pub chat_id: Option<String>,
    pub agent_name: Option<String>,
    pub kind: MemoryKind,
    pub title: String,
    pub content: String,
    /// Arbitrary structured payload.
    pub data: Option<Value>,
    /// Anchor references into the intent graph.
    pub intent_anchors: Option<Vec<String>>,
    /// Caller-supplied base relevance, set at creation.
    pub relevance_score: f64,
    pub expires_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl MemoryEntry {
    /// Whether the entry has passed its expiry time.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    /// Whether the entry has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether the entry carries no bead or epic scope.
    pub fn is_project_scoped(&self) -> bool {
        self.bead_id.is_none() && self.epic_id.is_none()
    }
}

/// Input for creating a new memory entry.
#[derive(Debug, Clone)]
pub struct CreateMemory {
    /// Generated when absent.
    pub id: Option<String>,
    pub project_id: String,
    pub bead_id: Option<String>,
    pub epic_id: Option<String>,
    pub session_id: Option<String>,
    pub chat_id: Option<String>,
    pub agent_name: Option<String>,
    pub kind: MemoryKind,
    pub title: String,
    pub content: String,
    pub data: Option<Value>,
    pub intent_anchors: Option<Vec<String>>,
    pub relevance_score: f64,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateMemory {
    /// Minimal project-scoped input; callers set scope and extras on
    /// the returned value.
    pub fn new(project_id: &str, kind: MemoryKind, title: &str, content: &str) -> Self {
        Self {
            id: None,
            project_id: project_id.to_string(),
            bead_id: None,
            epic_id: None,
            session_id: None,
            chat_id: None,
            agent_name: None,
            kind,
            title: title.to_string(),
            content: content.to_string(),
            data: None,
            intent_anchors: None,
            relevance_score: 0.5,
            expires_at: None,
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Scoped retrieval request.
#[derive(Debug, Clone, Default)]
pub struct ScopedMemoryQuery {
    pub project_id: String,
    pub bead_id: Option<String>,
    pub epic_id: Option<String>,
    /// Kind filter for the bead and epic tiers; constraint tiers ignore it.
    pub kinds: Option<Vec<MemoryKind>>,
    pub limit: Option<i64>,
    /// Include expired entries in the bead/epic/project tiers.
    /// Active constraints are always expiry-filtered.
    pub include_expired: bool,
}

impl ScopedMemoryQuery {
    pub fn for_project(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            ..Default::default()
        }
    }
}

/// Substring search request.
#[derive(Debug, Clone, Default)]
pub struct MemorySearch {
    pub project_id: String,
    pub text: String,
    pub bead_id: Option<String>,
    pub kinds: Option<Vec<MemoryKind>>,
    pub limit: Option<i64>,
}

// ============================================================================
// Results
// ============================================================================

/// The four-tier scoped retrieval result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScopedMemoryResult {
    /// Tier 1: entries scoped to the query's bead.
    pub bead_memories: Vec<MemoryEntry>,
    /// Tier 2: entries scoped to the query's epic and no bead.
    pub epic_memories: Vec<MemoryEntry>,
    /// Tier 3: project-wide constraints (no bead, no epic).
    pub project_constraints: Vec<MemoryEntry>,
    /// Tier 4: all live constraints regardless of scope.
    pub active_constraints: Vec<MemoryEntry>,
}

impl ScopedMemoryResult {
    pub fn is_empty(&self) -> bool {
        self.bead_memories.is_empty()
            && self.epic_memories.is_empty()
            && self.project_constraints.is_empty()
            && self.active_constraints.is_empty()
    }

    /// Total entries across all four tiers.
    pub fn total(&self) -> usize {
        self.bead_memories.len()
            + self.epic_memories.len()
            + self.project_constraints.len()
            + self.active_constraints.len()
    }
}

// ============================================================================
// Ranking
// ============================================================================

/// The caller's current working scope, used for proximity scoring.
#[derive(Debug, Clone, Default)]
pub struct ScoreContext {
    pub bead_id: Option<String>,
    pub epic_id: Option<String>,
}

impl From<&ScopedMemoryQuery> for ScoreContext {
    fn from(query: &ScopedMemoryQuery) -> Self {
        Self {
            bead_id: query.bead_id.clone(),
            epic_id: query.epic_id.clone(),
        }
    }
}

/// Per-factor decomposition of a computed relevance score.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoreBreakdown {
    pub base_relevance: f64,
    pub recency_boost: f64,
    pub scope_proximity: f64,
    pub kind_boost: f64,
}

/// A memory entry with its computed composite score. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RankedMemory {
    pub entry: MemoryEntry,
    pub computed_score: f64,
    pub breakdown: ScoreBreakdown,
}

// ============================================================================
// Briefs
// ============================================================================

/// Token-budgeted textual digest of memory entries.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryBrief {
    pub text: String,
    pub token_estimate: usize,
    pub included_count: usize,
    pub truncated_count: usize,
}

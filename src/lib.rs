//! Braid - Scoped Memory Retrieval
//!
//! The memory-retrieval core of a project-assistant dashboard. Memory
//! entries are scoped to a work hierarchy - bead (task), epic (group
//! of tasks), project - and retrieval resolves a query into four
//! tiers, ranks entries by a weighted composite score, and packs them
//! into a token-budgeted brief for an agent's context window.
//!
//! The store is a per-project SQLite database; its absence is a valid
//! state that yields empty results. All operations are read-only and
//! idempotent apart from the write-side collaborators (create and
//! soft-delete) on the storage port.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use error::{Error, Result};
pub use models::{
    CreateMemory, MemoryBrief, MemoryEntry, MemoryKind, MemorySearch, RankedMemory,
    ScopedMemoryQuery, ScopedMemoryResult, ScoreBreakdown, ScoreContext,
};
pub use services::{
    build_memory_brief, calculate_relevance_score, rank_memories, BriefEntry, BriefOptions,
    MemoryService,
};

//! Service layer for Braid.
//!
//! The retrieval engine proper:
//! - Scope (four-tier scoped resolution, active constraints, search)
//! - Scoring (weighted composite relevance for ranking)
//! - Brief (token-budgeted digest assembly)

pub mod brief;
pub mod scope;
pub mod scoring;

pub use brief::{build_memory_brief, estimate_tokens, BriefEntry, BriefOptions};
pub use scope::MemoryService;
pub use scoring::{calculate_relevance_score, rank_memories};

//! Data models for Braid.
//!
//! Defines the core types used by the retrieval engine: memory
//! entries, scoped queries and results, ranked memories, and briefs.

mod memory;

pub use memory::*;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new UUID
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

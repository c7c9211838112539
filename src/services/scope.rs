//! Scoped memory retrieval.
//!
//! Resolves a scoped query into four independent tiers — bead, epic,
//! project constraints, and cross-scope active constraints — without
//! letting entries leak between scopes. An entry scoped to a bead is
//! only ever returned through the bead tier; epic-tier results
//! exclude bead-scoped entries entirely. Project-wide entries reach
//! the resolver only when they are constraints, which keeps unscoped
//! general notes from flooding every retrieval.

use tracing::debug;

use crate::db::{self, DbPool, MemoryFilter};
use crate::models::{MemoryEntry, MemoryKind, MemorySearch, ScopedMemoryQuery, ScopedMemoryResult};
use crate::{Error, Result};

/// Retrieval service over a project's memory store.
///
/// The store is optional: a project that has never recorded a memory
/// has no database, and retrieval over the missing store yields empty
/// results rather than errors.
#[derive(Clone)]
pub struct MemoryService {
    db: Option<DbPool>,
}

impl MemoryService {
    /// Create a service over an initialized store.
    pub fn new(db: DbPool) -> Self {
        Self { db: Some(db) }
    }

    /// Create a service for a project with no memory store.
    pub fn detached() -> Self {
        Self { db: None }
    }

    pub fn database(&self) -> Option<&DbPool> {
        self.db.as_ref()
    }

    /// Resolve a scoped query into the four-tier result.
    ///
    /// Tier queries are built independently; `include_expired` and the
    /// kind filter apply to the bead/epic tiers only. The constraint
    /// tiers are hard-coded to `kind = constraint`, and the active
    /// tier is always expiry-filtered.
    pub async fn get_scoped_memories(
        &self,
        query: &ScopedMemoryQuery,
    ) -> Result<ScopedMemoryResult> {
        if query.project_id.is_empty() {
            return Err(Error::Validation("project_id is required".into()));
        }

        let Some(pool) = &self.db else {
            debug!(project = %query.project_id, "No memory store, returning empty result");
            return Ok(ScopedMemoryResult::default());
        };

        let mut result = ScopedMemoryResult::default();

        // Tier 1: bead-scoped
        if let Some(bead_id) = &query.bead_id {
            let filter = MemoryFilter {
                project_id: query.project_id.clone(),
                bead_id: Some(bead_id.clone()),
                kinds: query.kinds.clone(),
                include_expired: query.include_expired,
                limit: query.limit,
                ..Default::default()
            };
            result.bead_memories = db::query_memories(pool, &filter).await?;
        }

        // Tier 2: epic-scoped, excluding anything already bead-specific
        if let Some(epic_id) = &query.epic_id {
            let filter = MemoryFilter {
                project_id: query.project_id.clone(),
                epic_id: Some(epic_id.clone()),
                require_null_bead: true,
                kinds: query.kinds.clone(),
                include_expired: query.include_expired,
                limit: query.limit,
                ..Default::default()
            };
            result.epic_memories = db::query_memories(pool, &filter).await?;
        }

        // Tier 3: project-wide constraints only
        let filter = MemoryFilter {
            project_id: query.project_id.clone(),
            require_null_bead: true,
            require_null_epic: true,
            kind: Some(MemoryKind::Constraint),
            include_expired: query.include_expired,
            limit: query.limit,
            ..Default::default()
        };
        result.project_constraints = db::query_memories(pool, &filter).await?;

        // Tier 4: live constraints from every scope, rank-ordered
        // toward the query's bead and epic
        result.active_constraints = db::query_active_constraints(
            pool,
            &query.project_id,
            query.bead_id.as_deref(),
            query.epic_id.as_deref(),
            query.limit,
        )
        .await?;

        debug!(
            project = %query.project_id,
            bead = result.bead_memories.len(),
            epic = result.epic_memories.len(),
            project_constraints = result.project_constraints.len(),
            active_constraints = result.active_constraints.len(),
            "Scoped memory retrieval complete"
        );

        Ok(result)
    }

    /// All live constraints for a project, ordered by stored relevance
    /// then recency. A simpler view of the active tier, independent of
    /// any bead context.
    pub async fn get_active_constraints(&self, project_id: &str) -> Result<Vec<MemoryEntry>> {
        if project_id.is_empty() {
            return Err(Error::Validation("project_id is required".into()));
        }

        let Some(pool) = &self.db else {
            return Ok(Vec::new());
        };

        db::query_active_constraints(pool, project_id, None, None, None).await
    }

    /// Substring search over titles and content. Not deleted, not
    /// expired, optional bead and kind filters; ordering comes from the
    /// stored relevance score alone.
    pub async fn search_memories(&self, search: &MemorySearch) -> Result<Vec<MemoryEntry>> {
        if search.project_id.is_empty() {
            return Err(Error::Validation("project_id is required".into()));
        }

        let Some(pool) = &self.db else {
            return Ok(Vec::new());
        };

        let filter = MemoryFilter {
            project_id: search.project_id.clone(),
            bead_id: search.bead_id.clone(),
            kinds: search.kinds.clone(),
            search: Some(search.text.clone()),
            limit: search.limit,
            ..Default::default()
        };

        db::query_memories(pool, &filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_project_id_rejected() {
        let service = MemoryService::detached();
        let err = service
            .get_scoped_memories(&ScopedMemoryQuery::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let err = service.get_active_constraints("").await.unwrap_err();
        assert!(err.is_validation());

        let err = service
            .search_memories(&MemorySearch::default())
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_absent_store_yields_empty_results() {
        let service = MemoryService::detached();

        let result = service
            .get_scoped_memories(&ScopedMemoryQuery::for_project("proj-1"))
            .await
            .unwrap();
        assert!(result.is_empty());

        let constraints = service.get_active_constraints("proj-1").await.unwrap();
        assert!(constraints.is_empty());

        let search = MemorySearch {
            project_id: "proj-1".into(),
            text: "anything".into(),
            ..Default::default()
        };
        assert!(service.search_memories(&search).await.unwrap().is_empty());
    }
}

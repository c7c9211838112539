//! Memory entry queries.
//!
//! The storage port for the retrieval engine: a predicate-list query
//! builder over the memories table plus the write-side collaborators
//! (create, soft-delete). Rows are mapped to typed [`MemoryEntry`]
//! values at this boundary; nothing above it sees raw columns.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::debug;

use crate::models::{self, CreateMemory, MemoryEntry, MemoryKind};
use crate::{config, Error, Result};

use super::DbPool;

// ============================================================================
// Row mapping
// ============================================================================

/// Raw row shape. JSON columns stay as text here and are decoded in
/// the conversion to [`MemoryEntry`].
#[derive(Debug, Clone, FromRow)]
struct MemoryRow {
    id: String,
    project_id: String,
    bead_id: Option<String>,
    epic_id: Option<String>,
    session_id: Option<String>,
    chat_id: Option<String>,
    agent_name: Option<String>,
    kind: String,
    title: String,
    content: String,
    data: Option<String>,
    intent_anchors: Option<String>,
    relevance_score: f64,
    expires_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MemoryRow> for MemoryEntry {
    type Error = Error;

    fn try_from(row: MemoryRow) -> Result<Self> {
        let kind = MemoryKind::from_str(&row.kind)
            .ok_or_else(|| Error::Internal(format!("Unknown memory kind: {}", row.kind)))?;

        let data = row
            .data
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        let intent_anchors = row
            .intent_anchors
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(MemoryEntry {
            id: row.id,
            project_id: row.project_id,
            bead_id: row.bead_id,
            epic_id: row.epic_id,
            session_id: row.session_id,
            chat_id: row.chat_id,
            agent_name: row.agent_name,
            kind,
            title: row.title,
            content: row.content,
            data,
            intent_anchors,
            relevance_score: row.relevance_score,
            expires_at: row.expires_at,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
        })
    }
}

fn rows_to_entries(rows: Vec<MemoryRow>) -> Result<Vec<MemoryEntry>> {
    rows.into_iter().map(MemoryEntry::try_from).collect()
}

// ============================================================================
// Query builder
// ============================================================================

/// A positional query parameter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum QueryParam {
    Text(String),
    Timestamp(DateTime<Utc>),
}

/// Conditions and their parameters, accumulated in lockstep so that
/// predicate/placeholder pairing can never drift.
#[derive(Debug, Clone, Default)]
pub(crate) struct QueryParts {
    conditions: Vec<String>,
    params: Vec<QueryParam>,
}

impl QueryParts {
    fn push(&mut self, condition: &str, param: QueryParam) {
        self.conditions.push(condition.to_string());
        self.params.push(param);
    }

    /// Condition with no parameter (IS NULL checks and the like).
    fn push_static(&mut self, condition: &str) {
        self.conditions.push(condition.to_string());
    }

    /// Condition with several parameters.
    fn push_with(&mut self, condition: &str, params: impl IntoIterator<Item = QueryParam>) {
        self.conditions.push(condition.to_string());
        self.params.extend(params);
    }

    /// `kind IN (?, ...)` over the given kinds; no-op when empty.
    fn push_kinds(&mut self, kinds: &[MemoryKind]) {
        if kinds.is_empty() {
            return;
        }
        let placeholders: Vec<&str> = kinds.iter().map(|_| "?").collect();
        self.conditions
            .push(format!("kind IN ({})", placeholders.join(", ")));
        for kind in kinds {
            self.params.push(QueryParam::Text(kind.as_str().to_string()));
        }
    }

    pub(crate) fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub(crate) fn params(&self) -> &[QueryParam] {
        &self.params
    }
}

/// Filter options for memory queries. Serves the bead, epic and
/// project tiers as well as substring search; the active-constraint
/// query has its own shape (rank ordering) below.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    pub project_id: String,
    /// Require `bead_id` equality.
    pub bead_id: Option<String>,
    /// Require `bead_id IS NULL`.
    pub require_null_bead: bool,
    /// Require `epic_id` equality.
    pub epic_id: Option<String>,
    /// Require `epic_id IS NULL`.
    pub require_null_epic: bool,
    /// Require a single kind (constraint tiers).
    pub kind: Option<MemoryKind>,
    /// Restrict to a set of kinds (caller-supplied filter).
    pub kinds: Option<Vec<MemoryKind>>,
    /// Substring match over title and content.
    pub search: Option<String>,
    pub include_expired: bool,
    pub limit: Option<i64>,
}

impl MemoryFilter {
    pub(crate) fn to_query_parts(&self, now: DateTime<Utc>) -> QueryParts {
        let mut parts = QueryParts::default();

        parts.push("project_id = ?", QueryParam::Text(self.project_id.clone()));

        if let Some(bead_id) = &self.bead_id {
            parts.push("bead_id = ?", QueryParam::Text(bead_id.clone()));
        }
        if self.require_null_bead {
            parts.push_static("bead_id IS NULL");
        }
        if let Some(epic_id) = &self.epic_id {
            parts.push("epic_id = ?", QueryParam::Text(epic_id.clone()));
        }
        if self.require_null_epic {
            parts.push_static("epic_id IS NULL");
        }

        parts.push_static("deleted_at IS NULL");

        if !self.include_expired {
            parts.push(
                "(expires_at IS NULL OR expires_at > ?)",
                QueryParam::Timestamp(now),
            );
        }

        if let Some(kind) = self.kind {
            parts.push("kind = ?", QueryParam::Text(kind.as_str().to_string()));
        }
        if let Some(kinds) = &self.kinds {
            parts.push_kinds(kinds);
        }

        if let Some(search) = &self.search {
            let pattern = format!("%{}%", search);
            parts.push_with(
                "(title LIKE ? OR content LIKE ?)",
                [QueryParam::Text(pattern.clone()), QueryParam::Text(pattern)],
            );
        }

        parts
    }
}

// ============================================================================
// Read queries
// ============================================================================

/// Query memories matching a filter, ordered by stored relevance then
/// recency, capped at the filter's limit (configured default otherwise).
pub async fn query_memories(pool: &DbPool, filter: &MemoryFilter) -> Result<Vec<MemoryEntry>> {
    let parts = filter.to_query_parts(models::now());
    let limit = filter.limit.unwrap_or(config::config().memory_limit);

    let sql = format!(
        r#"
        SELECT * FROM memories
        {}
        ORDER BY relevance_score DESC, created_at DESC
        LIMIT ?
        "#,
        parts.where_clause()
    );

    let mut q = sqlx::query_as::<_, MemoryRow>(&sql);
    for param in parts.params() {
        q = match param {
            QueryParam::Text(text) => q.bind(text.clone()),
            QueryParam::Timestamp(ts) => q.bind(*ts),
        };
    }
    q = q.bind(limit);

    let rows = q.fetch_all(pool).await.map_err(Error::Database)?;
    debug!(matched = rows.len(), "Memory query complete");
    rows_to_entries(rows)
}

/// Query live constraints across every scope of a project.
///
/// When a bead or epic context is supplied, results are rank-ordered:
/// bead-matching constraints first, then epic-matching, then the rest,
/// with stored relevance breaking ties inside each rank. Expired
/// constraints are always excluded, regardless of any caller flag.
pub async fn query_active_constraints(
    pool: &DbPool,
    project_id: &str,
    bead_id: Option<&str>,
    epic_id: Option<&str>,
    limit: Option<i64>,
) -> Result<Vec<MemoryEntry>> {
    let ranked = bead_id.is_some() || epic_id.is_some();
    let order = if ranked {
        "CASE WHEN bead_id = ? THEN 1 WHEN epic_id = ? THEN 2 ELSE 3 END, \
         relevance_score DESC, created_at DESC"
    } else {
        "relevance_score DESC, created_at DESC"
    };

    let sql = format!(
        r#"
        SELECT * FROM memories
        WHERE project_id = ?
          AND kind = 'constraint'
          AND deleted_at IS NULL
          AND (expires_at IS NULL OR expires_at > ?)
        ORDER BY {}
        LIMIT ?
        "#,
        order
    );

    let mut q = sqlx::query_as::<_, MemoryRow>(&sql)
        .bind(project_id)
        .bind(models::now());
    if ranked {
        // Comparing against NULL never matches, so a missing side of the
        // context simply falls through to the next rank.
        q = q.bind(bead_id).bind(epic_id);
    }
    q = q.bind(limit.unwrap_or(config::config().memory_limit));

    let rows = q.fetch_all(pool).await.map_err(Error::Database)?;
    rows_to_entries(rows)
}

/// Get a memory entry by ID (soft-deleted entries included).
pub async fn get_memory(pool: &DbPool, id: &str) -> Result<MemoryEntry> {
    let row = sqlx::query_as::<_, MemoryRow>("SELECT * FROM memories WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Memory not found: {}", id)))?;
    row.try_into()
}

// ============================================================================
// Write collaborators
// ============================================================================

/// Create a new memory entry.
pub async fn create_memory(pool: &DbPool, input: CreateMemory) -> Result<MemoryEntry> {
    if input.project_id.is_empty() {
        return Err(Error::Validation("project_id is required".into()));
    }
    if input.title.is_empty() {
        return Err(Error::Validation("title must not be empty".into()));
    }
    if input.content.is_empty() {
        return Err(Error::Validation("content must not be empty".into()));
    }

    let id = input.id.unwrap_or_else(models::new_id);
    let data_json = input.data.map(|d| serde_json::to_string(&d)).transpose()?;
    let anchors_json = input
        .intent_anchors
        .map(|a| serde_json::to_string(&a))
        .transpose()?;

    let row = sqlx::query_as::<_, MemoryRow>(
        r#"
        INSERT INTO memories (
            id, project_id, bead_id, epic_id, session_id, chat_id, agent_name,
            kind, title, content, data, intent_anchors, relevance_score,
            expires_at, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&input.project_id)
    .bind(&input.bead_id)
    .bind(&input.epic_id)
    .bind(&input.session_id)
    .bind(&input.chat_id)
    .bind(&input.agent_name)
    .bind(input.kind.as_str())
    .bind(&input.title)
    .bind(&input.content)
    .bind(&data_json)
    .bind(&anchors_json)
    .bind(input.relevance_score)
    .bind(input.expires_at)
    .bind(models::now())
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            Error::AlreadyExists(format!("Memory already exists: {}", id))
        }
        _ => Error::Database(e),
    })?;

    row.try_into()
}

/// Soft-delete a memory entry. Entries are never physically removed.
pub async fn soft_delete_memory(pool: &DbPool, id: &str) -> Result<()> {
    let result = sqlx::query("UPDATE memories SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(models::now())
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Memory not found: {}", id)));
    }

    Ok(())
}

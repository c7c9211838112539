//! End-to-end retrieval tests over an in-memory SQLite store.
//!
//! Exercises the tier separation rules, active-constraint rank
//! ordering, expiry asymmetry, and the rank-then-brief pipeline.

use chrono::Duration;

use braid::db::{self, DbPool};
use braid::models::now;
use braid::services::{build_memory_brief, rank_memories, BriefEntry, BriefOptions};
use braid::{
    CreateMemory, MemoryKind, MemorySearch, MemoryService, ScopedMemoryQuery, ScoreContext,
};

async fn setup() -> (DbPool, MemoryService) {
    let pool = db::init_pool(":memory:").await.unwrap();
    db::initialize_schema(&pool).await.unwrap();
    let service = MemoryService::new(pool.clone());
    (pool, service)
}

fn mem(title: &str, kind: MemoryKind) -> CreateMemory {
    CreateMemory::new("P1", kind, title, "body text")
}

fn bead_query() -> ScopedMemoryQuery {
    ScopedMemoryQuery {
        project_id: "P1".into(),
        bead_id: Some("B1".into()),
        epic_id: Some("E1".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn bead_scoped_entries_stay_in_tier_one() {
    let (pool, service) = setup().await;

    let mut create = mem("Bead decision", MemoryKind::Decision);
    create.bead_id = Some("B1".into());
    create.epic_id = Some("E1".into());
    db::create_memory(&pool, create).await.unwrap();

    let result = service.get_scoped_memories(&bead_query()).await.unwrap();
    assert_eq!(result.bead_memories.len(), 1);
    assert!(result.epic_memories.is_empty());
    assert!(result.project_constraints.is_empty());
}

#[tokio::test]
async fn epic_tier_excludes_bead_scoped_entries() {
    let (pool, service) = setup().await;

    let mut epic_only = mem("Epic note", MemoryKind::NextStep);
    epic_only.epic_id = Some("E1".into());
    db::create_memory(&pool, epic_only).await.unwrap();

    let mut bead_in_epic = mem("Bead note", MemoryKind::NextStep);
    bead_in_epic.epic_id = Some("E1".into());
    bead_in_epic.bead_id = Some("B1".into());
    db::create_memory(&pool, bead_in_epic).await.unwrap();

    let result = service.get_scoped_memories(&bead_query()).await.unwrap();
    let epic_titles: Vec<&str> = result
        .epic_memories
        .iter()
        .map(|e| e.title.as_str())
        .collect();
    assert_eq!(epic_titles, vec!["Epic note"]);
    assert_eq!(result.bead_memories.len(), 1);
    assert_eq!(result.bead_memories[0].title, "Bead note");
}

#[tokio::test]
async fn unscoped_non_constraints_reach_no_tier() {
    let (pool, service) = setup().await;

    db::create_memory(&pool, mem("General note", MemoryKind::Checkpoint))
        .await
        .unwrap();

    let result = service.get_scoped_memories(&bead_query()).await.unwrap();
    assert!(result.is_empty());

    // But search still finds it
    let hits = service
        .search_memories(&MemorySearch {
            project_id: "P1".into(),
            text: "General".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
}

#[tokio::test]
async fn project_constraint_tier_takes_constraints_only() {
    let (pool, service) = setup().await;

    db::create_memory(&pool, mem("Unscoped rule", MemoryKind::Constraint))
        .await
        .unwrap();
    db::create_memory(&pool, mem("Unscoped decision", MemoryKind::Decision))
        .await
        .unwrap();

    let result = service.get_scoped_memories(&bead_query()).await.unwrap();
    assert_eq!(result.project_constraints.len(), 1);
    assert_eq!(result.project_constraints[0].title, "Unscoped rule");
}

#[tokio::test]
async fn kind_filter_applies_to_bead_and_epic_tiers_only() {
    let (pool, service) = setup().await;

    let mut decision = mem("Bead decision", MemoryKind::Decision);
    decision.bead_id = Some("B1".into());
    db::create_memory(&pool, decision).await.unwrap();

    let mut checkpoint = mem("Bead checkpoint", MemoryKind::Checkpoint);
    checkpoint.bead_id = Some("B1".into());
    db::create_memory(&pool, checkpoint).await.unwrap();

    db::create_memory(&pool, mem("Unscoped rule", MemoryKind::Constraint))
        .await
        .unwrap();

    let mut query = bead_query();
    query.kinds = Some(vec![MemoryKind::Decision]);
    let result = service.get_scoped_memories(&query).await.unwrap();

    assert_eq!(result.bead_memories.len(), 1);
    assert_eq!(result.bead_memories[0].title, "Bead decision");
    // Constraint tiers ignore the kind filter
    assert_eq!(result.project_constraints.len(), 1);
    assert_eq!(result.active_constraints.len(), 1);
}

#[tokio::test]
async fn active_constraint_rank_dominates_score() {
    let (pool, service) = setup().await;

    let mut unrelated = mem("C-unrelated", MemoryKind::Constraint);
    unrelated.bead_id = Some("B9".into());
    unrelated.relevance_score = 1.0;
    db::create_memory(&pool, unrelated).await.unwrap();

    let mut epic_match = mem("C-epic", MemoryKind::Constraint);
    epic_match.epic_id = Some("E1".into());
    epic_match.relevance_score = 0.2;
    db::create_memory(&pool, epic_match).await.unwrap();

    let mut bead_match = mem("C-bead", MemoryKind::Constraint);
    bead_match.bead_id = Some("B1".into());
    bead_match.relevance_score = 0.1;
    db::create_memory(&pool, bead_match).await.unwrap();

    let result = service.get_scoped_memories(&bead_query()).await.unwrap();
    let titles: Vec<&str> = result
        .active_constraints
        .iter()
        .map(|e| e.title.as_str())
        .collect();
    assert_eq!(titles, vec!["C-bead", "C-epic", "C-unrelated"]);
}

#[tokio::test]
async fn include_expired_spares_tiers_one_to_three_but_not_four() {
    let (pool, service) = setup().await;

    let mut expired_bead = mem("Expired bead note", MemoryKind::Decision);
    expired_bead.bead_id = Some("B1".into());
    expired_bead.expires_at = Some(now() - Duration::hours(2));
    db::create_memory(&pool, expired_bead).await.unwrap();

    let mut expired_rule = mem("Expired rule", MemoryKind::Constraint);
    expired_rule.expires_at = Some(now() - Duration::hours(2));
    db::create_memory(&pool, expired_rule).await.unwrap();

    let result = service.get_scoped_memories(&bead_query()).await.unwrap();
    assert!(result.is_empty());

    let mut query = bead_query();
    query.include_expired = true;
    let result = service.get_scoped_memories(&query).await.unwrap();

    assert_eq!(result.bead_memories.len(), 1);
    assert_eq!(result.project_constraints.len(), 1);
    // The active tier never honours include_expired
    assert!(result.active_constraints.is_empty());
}

#[tokio::test]
async fn soft_deleted_entries_invisible_everywhere() {
    let (pool, service) = setup().await;

    let mut create = mem("Doomed", MemoryKind::Constraint);
    create.bead_id = Some("B1".into());
    let created = db::create_memory(&pool, create).await.unwrap();
    db::soft_delete_memory(&pool, &created.id).await.unwrap();

    let result = service.get_scoped_memories(&bead_query()).await.unwrap();
    assert!(result.is_empty());

    let hits = service
        .search_memories(&MemorySearch {
            project_id: "P1".into(),
            text: "Doomed".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn get_active_constraints_orders_by_score_then_recency() {
    let (pool, service) = setup().await;

    let mut low = mem("Low", MemoryKind::Constraint);
    low.relevance_score = 0.2;
    low.bead_id = Some("B7".into());
    db::create_memory(&pool, low).await.unwrap();

    let mut high = mem("High", MemoryKind::Constraint);
    high.relevance_score = 0.9;
    db::create_memory(&pool, high).await.unwrap();

    let constraints = service.get_active_constraints("P1").await.unwrap();
    let titles: Vec<&str> = constraints.iter().map(|e| e.title.as_str()).collect();
    // No bead context: stored relevance alone decides
    assert_eq!(titles, vec!["High", "Low"]);
}

#[tokio::test]
async fn search_respects_bead_and_kind_filters() {
    let (pool, service) = setup().await;

    let mut in_bead = mem("Auth decision", MemoryKind::Decision);
    in_bead.bead_id = Some("B1".into());
    db::create_memory(&pool, in_bead).await.unwrap();

    let mut other_bead = mem("Auth checkpoint", MemoryKind::Checkpoint);
    other_bead.bead_id = Some("B2".into());
    db::create_memory(&pool, other_bead).await.unwrap();

    let hits = service
        .search_memories(&MemorySearch {
            project_id: "P1".into(),
            text: "Auth".into(),
            bead_id: Some("B1".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Auth decision");

    let hits = service
        .search_memories(&MemorySearch {
            project_id: "P1".into(),
            text: "Auth".into(),
            kinds: Some(vec![MemoryKind::Checkpoint]),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].title, "Auth checkpoint");
}

#[tokio::test]
async fn end_to_end_scenario() {
    let (pool, service) = setup().await;

    let mut bead_entry = mem("B1 decision", MemoryKind::Decision);
    bead_entry.bead_id = Some("B1".into());
    db::create_memory(&pool, bead_entry).await.unwrap();

    let mut epic_entry = mem("E1 next step", MemoryKind::NextStep);
    epic_entry.epic_id = Some("E1".into());
    db::create_memory(&pool, epic_entry).await.unwrap();

    let mut unscoped_rule = mem("Unscoped rule", MemoryKind::Constraint);
    unscoped_rule.relevance_score = 0.9;
    db::create_memory(&pool, unscoped_rule).await.unwrap();

    let mut b2_rule = mem("B2 rule", MemoryKind::Constraint);
    b2_rule.bead_id = Some("B2".into());
    b2_rule.relevance_score = 0.4;
    db::create_memory(&pool, b2_rule).await.unwrap();

    let result = service.get_scoped_memories(&bead_query()).await.unwrap();

    assert_eq!(result.bead_memories.len(), 1);
    assert_eq!(result.bead_memories[0].title, "B1 decision");

    assert_eq!(result.epic_memories.len(), 1);
    assert_eq!(result.epic_memories[0].title, "E1 next step");

    assert_eq!(result.project_constraints.len(), 1);
    assert_eq!(result.project_constraints[0].title, "Unscoped rule");

    // Neither constraint matches B1/E1, so both sit at rank three and
    // stored relevance decides
    let titles: Vec<&str> = result
        .active_constraints
        .iter()
        .map(|e| e.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Unscoped rule", "B2 rule"]);
}

#[tokio::test]
async fn rank_then_brief_pipeline() {
    let (pool, service) = setup().await;

    let mut bead_entry = mem("Bead decision", MemoryKind::Decision);
    bead_entry.bead_id = Some("B1".into());
    bead_entry.relevance_score = 0.6;
    db::create_memory(&pool, bead_entry).await.unwrap();

    let mut epic_entry = mem("Epic checkpoint", MemoryKind::Checkpoint);
    epic_entry.epic_id = Some("E1".into());
    epic_entry.relevance_score = 0.6;
    db::create_memory(&pool, epic_entry).await.unwrap();

    db::create_memory(&pool, mem("Unscoped rule", MemoryKind::Constraint))
        .await
        .unwrap();

    let query = bead_query();
    let result = service.get_scoped_memories(&query).await.unwrap();

    let mut pool_of_entries = result.bead_memories;
    pool_of_entries.extend(result.epic_memories);
    pool_of_entries.extend(result.project_constraints);

    let context = ScoreContext::from(&query);
    let ranked = rank_memories(pool_of_entries, &context);
    // Bead proximity beats epic proximity at equal base score
    assert_eq!(ranked[0].entry.title, "Bead decision");

    let entries: Vec<BriefEntry> = ranked.into_iter().map(BriefEntry::from).collect();
    let brief = build_memory_brief(
        &entries,
        &BriefOptions {
            include_score_breakdown: true,
            ..Default::default()
        },
    );

    assert_eq!(brief.included_count, 3);
    assert_eq!(brief.truncated_count, 0);
    // Constraints are packed first regardless of rank
    let rule_pos = brief.text.find("Unscoped rule").unwrap();
    let bead_pos = brief.text.find("Bead decision").unwrap();
    assert!(rule_pos < bead_pos);
    assert!(brief.text.contains("_relevance:"));
}

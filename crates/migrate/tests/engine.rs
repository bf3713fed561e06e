//! End-to-end engine scenarios against the in-memory store.

use quorum_migrate::catalog::{CreateIndexes, SeedApprovalChain};
use quorum_migrate::stage::{load_chain, MEMBER_ONBOARDING};
use quorum_migrate::{MigrationRegistry, MigrationRunner};
use quorum_storage::MemoryStore;

#[tokio::test]
async fn fresh_store_runs_the_first_two_migrations_once() {
    let runner = MigrationRunner::new(MemoryStore::new());
    let registry = MigrationRegistry::builder()
        .register(CreateIndexes)
        .register(SeedApprovalChain)
        .build()
        .unwrap();

    let report = runner.run(&registry).await.unwrap();
    assert_eq!(report.executed, vec!["001-create-indexes", "002-add-approval-order"]);

    let status = runner.status().await.unwrap();
    assert_eq!(status.total, 2);
    assert_eq!(status.completed, 2);
    assert_eq!(status.failed, 0);
    assert_eq!(status.rolled_back, 0);
    assert_eq!(status.migrations.len(), 2);

    // One record per unit, both completed, durations measured.
    for record in &status.migrations {
        assert!(record.execution_time_ms >= 0);
        assert!(record.error.is_none());
    }

    assert_eq!(runner.store().index_count(), 3);
    let chain = load_chain(runner.store(), MEMBER_ONBOARDING).await.unwrap();
    chain.validate().unwrap();
    assert_eq!(chain.stage_names(), vec!["committee", "board", "ceo"]);
}

#[tokio::test]
async fn status_report_serializes_for_the_operator_surface() {
    let runner = MigrationRunner::new(MemoryStore::new());
    let registry = MigrationRegistry::builder()
        .register(CreateIndexes)
        .build()
        .unwrap();
    runner.run(&registry).await.unwrap();

    let status = runner.status().await.unwrap();
    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["completed"], 1);
    assert_eq!(json["migrations"][0]["name"], "001-create-indexes");
    assert_eq!(json["migrations"][0]["status"], "completed");
}

use std::future::Future;

use super::{make_transition, TestResult};
use crate::{MembershipStore, StorageError};

pub(super) async fn run_stage_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "stages",
        "upsert_keyed_by_workflow_and_stage",
        upsert_keyed_by_workflow_and_stage(factory).await,
    ));
    results.push(TestResult::from_result(
        "stages",
        "list_sorted_by_order",
        list_sorted_by_order(factory).await,
    ));
    results.push(TestResult::from_result(
        "stages",
        "list_isolated_across_workflow_types",
        list_isolated_across_workflow_types(factory).await,
    ));
    results.push(TestResult::from_result(
        "stages",
        "delete_removes_row",
        delete_removes_row(factory).await,
    ));
    results.push(TestResult::from_result(
        "stages",
        "delete_missing_row_errors",
        delete_missing_row_errors(factory).await,
    ));

    results
}

async fn upsert_keyed_by_workflow_and_stage<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .upsert_transition(make_transition("member_onboarding", "committee", "board", 1))
        .await
        .map_err(|e| e.to_string())?;

    // Same key, new next_stage -- must overwrite, not duplicate.
    store
        .upsert_transition(make_transition("member_onboarding", "committee", "ceo", 1))
        .await
        .map_err(|e| e.to_string())?;

    let rows = store
        .list_transitions("member_onboarding")
        .await
        .map_err(|e| e.to_string())?;
    if rows.len() != 1 {
        return Err(format!("expected 1 row after keyed upsert, got {}", rows.len()));
    }
    if rows[0].next_stage != "ceo" {
        return Err(format!("row not overwritten: next_stage = {}", rows[0].next_stage));
    }

    let found = store
        .find_transition("member_onboarding", "committee")
        .await
        .map_err(|e| e.to_string())?
        .ok_or("row not found by key")?;
    if found.next_stage != "ceo" {
        return Err("find_transition returned stale row".to_string());
    }
    Ok(())
}

async fn list_sorted_by_order<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    // Insert out of order on purpose.
    store
        .upsert_transition(make_transition("member_onboarding", "ceo", "approved", 3))
        .await
        .map_err(|e| e.to_string())?;
    store
        .upsert_transition(make_transition("member_onboarding", "committee", "board", 1))
        .await
        .map_err(|e| e.to_string())?;
    store
        .upsert_transition(make_transition("member_onboarding", "board", "ceo", 2))
        .await
        .map_err(|e| e.to_string())?;

    let rows = store
        .list_transitions("member_onboarding")
        .await
        .map_err(|e| e.to_string())?;
    let orders: Vec<i64> = rows.iter().map(|r| r.order).collect();
    if orders != vec![1, 2, 3] {
        return Err(format!("rows not sorted by order: {orders:?}"));
    }
    Ok(())
}

async fn list_isolated_across_workflow_types<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .upsert_transition(make_transition("member_onboarding", "committee", "ceo", 1))
        .await
        .map_err(|e| e.to_string())?;
    store
        .upsert_transition(make_transition("sponsor_onboarding", "committee", "treasurer", 1))
        .await
        .map_err(|e| e.to_string())?;

    let rows = store
        .list_transitions("member_onboarding")
        .await
        .map_err(|e| e.to_string())?;
    if rows.len() != 1 || rows[0].next_stage != "ceo" {
        return Err(format!("workflow isolation violated: {rows:?}"));
    }
    Ok(())
}

async fn delete_removes_row<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .upsert_transition(make_transition("member_onboarding", "board", "ceo", 2))
        .await
        .map_err(|e| e.to_string())?;

    store
        .delete_transition("member_onboarding", "board")
        .await
        .map_err(|e| e.to_string())?;

    let found = store
        .find_transition("member_onboarding", "board")
        .await
        .map_err(|e| e.to_string())?;
    if found.is_some() {
        return Err("row still present after delete".to_string());
    }
    Ok(())
}

async fn delete_missing_row_errors<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    match store.delete_transition("member_onboarding", "board").await {
        Err(StorageError::TransitionNotFound {
            workflow_type,
            current_stage,
        }) => {
            if workflow_type != "member_onboarding" || current_stage != "board" {
                return Err("TransitionNotFound carries wrong key".to_string());
            }
            Ok(())
        }
        Err(other) => Err(format!("expected TransitionNotFound, got: {other}")),
        Ok(()) => Err("expected TransitionNotFound, got Ok".to_string()),
    }
}

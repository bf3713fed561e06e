use std::future::Future;

use super::{make_execution, TestResult};
use crate::record::ExecutionStatus;
use crate::MembershipStore;

pub(super) async fn run_execution_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "executions",
        "find_on_empty_store_returns_none",
        find_on_empty_store_returns_none(factory).await,
    ));
    results.push(TestResult::from_result(
        "executions",
        "upsert_then_find_round_trips",
        upsert_then_find_round_trips(factory).await,
    ));
    results.push(TestResult::from_result(
        "executions",
        "upsert_overwrites_in_place",
        upsert_overwrites_in_place(factory).await,
    ));
    results.push(TestResult::from_result(
        "executions",
        "list_returns_all_records",
        list_returns_all_records(factory).await,
    ));
    results.push(TestResult::from_result(
        "executions",
        "failed_record_preserves_error_message",
        failed_record_preserves_error_message(factory).await,
    ));

    results
}

async fn find_on_empty_store_returns_none<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let found = store
        .find_execution("001-missing")
        .await
        .map_err(|e| e.to_string())?;
    if found.is_some() {
        return Err("expected None for a never-executed migration".to_string());
    }
    Ok(())
}

async fn upsert_then_find_round_trips<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let record = make_execution("001-create-indexes", ExecutionStatus::Completed);
    store
        .upsert_execution(record.clone())
        .await
        .map_err(|e| e.to_string())?;

    let found = store
        .find_execution("001-create-indexes")
        .await
        .map_err(|e| e.to_string())?
        .ok_or("record not found after upsert")?;

    if found.executed_at != record.executed_at
        || found.execution_time_ms != record.execution_time_ms
        || found.status != ExecutionStatus::Completed
        || found.error.is_some()
    {
        return Err(format!("round-trip mismatch: {found:?}"));
    }
    Ok(())
}

async fn upsert_overwrites_in_place<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .upsert_execution(make_execution("002-add-approval-order", ExecutionStatus::Failed))
        .await
        .map_err(|e| e.to_string())?;

    // Retry flips the same record to completed; it must not append.
    let mut retry = make_execution("002-add-approval-order", ExecutionStatus::Completed);
    retry.executed_at = "2026-01-02T00:00:00.000Z".to_string();
    store
        .upsert_execution(retry)
        .await
        .map_err(|e| e.to_string())?;

    let all = store.list_executions().await.map_err(|e| e.to_string())?;
    if all.len() != 1 {
        return Err(format!("expected 1 record after overwrite, got {}", all.len()));
    }
    if all[0].status != ExecutionStatus::Completed || all[0].error.is_some() {
        return Err(format!("record not overwritten: {:?}", all[0]));
    }
    Ok(())
}

async fn list_returns_all_records<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    for name in ["001-a", "002-b", "003-c"] {
        store
            .upsert_execution(make_execution(name, ExecutionStatus::Completed))
            .await
            .map_err(|e| e.to_string())?;
    }
    let all = store.list_executions().await.map_err(|e| e.to_string())?;
    if all.len() != 3 {
        return Err(format!("expected 3 records, got {}", all.len()));
    }
    for name in ["001-a", "002-b", "003-c"] {
        if !all.iter().any(|r| r.name == name) {
            return Err(format!("record '{name}' missing from list"));
        }
    }
    Ok(())
}

async fn failed_record_preserves_error_message<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .upsert_execution(make_execution("004-broken", ExecutionStatus::Failed))
        .await
        .map_err(|e| e.to_string())?;

    let found = store
        .find_execution("004-broken")
        .await
        .map_err(|e| e.to_string())?
        .ok_or("failed record not found")?;
    if found.error.as_deref() != Some("boom") {
        return Err(format!("error message not preserved: {:?}", found.error));
    }
    Ok(())
}

use std::future::Future;

use super::{make_application, TestResult};
use crate::record::StageHistoryEntry;
use crate::{MembershipStore, StorageError};

pub(super) async fn run_application_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "applications",
        "scan_filters_by_workflow_type",
        scan_filters_by_workflow_type(factory).await,
    ));
    results.push(TestResult::from_result(
        "applications",
        "update_history_replaces_entries",
        update_history_replaces_entries(factory).await,
    ));
    results.push(TestResult::from_result(
        "applications",
        "update_history_stamps_updated_at",
        update_history_stamps_updated_at(factory).await,
    ));
    results.push(TestResult::from_result(
        "applications",
        "update_history_missing_id_errors",
        update_history_missing_id_errors(factory).await,
    ));

    results
}

fn entry(stage: &str, order: i64) -> StageHistoryEntry {
    StageHistoryEntry {
        stage: stage.to_string(),
        order,
        recorded_at: "2026-01-15T09:30:00.000Z".to_string(),
        actor: "ops@example.org".to_string(),
    }
}

async fn scan_filters_by_workflow_type<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .upsert_application(make_application("app-1", "member_onboarding"))
        .await
        .map_err(|e| e.to_string())?;
    store
        .upsert_application(make_application("app-2", "member_onboarding"))
        .await
        .map_err(|e| e.to_string())?;
    store
        .upsert_application(make_application("app-3", "sponsor_onboarding"))
        .await
        .map_err(|e| e.to_string())?;

    let apps = store
        .scan_applications("member_onboarding")
        .await
        .map_err(|e| e.to_string())?;
    if apps.len() != 2 {
        return Err(format!("expected 2 applications, got {}", apps.len()));
    }
    if apps.iter().any(|a| a.workflow_type != "member_onboarding") {
        return Err("scan leaked another workflow's application".to_string());
    }
    Ok(())
}

async fn update_history_replaces_entries<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut app = make_application("app-1", "member_onboarding");
    app.stage_history = vec![entry("committee", 1), entry("board", 2)];
    store
        .upsert_application(app)
        .await
        .map_err(|e| e.to_string())?;

    store
        .update_application_history(
            "app-1",
            vec![entry("committee", 1)],
            "2026-02-01T00:00:00.000Z",
        )
        .await
        .map_err(|e| e.to_string())?;

    let apps = store
        .scan_applications("member_onboarding")
        .await
        .map_err(|e| e.to_string())?;
    let app = apps
        .iter()
        .find(|a| a.id == "app-1")
        .ok_or("application vanished")?;
    if app.stage_history.len() != 1 || app.stage_history[0].stage != "committee" {
        return Err(format!("history not replaced: {:?}", app.stage_history));
    }
    Ok(())
}

async fn update_history_stamps_updated_at<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .upsert_application(make_application("app-1", "member_onboarding"))
        .await
        .map_err(|e| e.to_string())?;

    store
        .update_application_history("app-1", Vec::new(), "2026-03-01T12:00:00.000Z")
        .await
        .map_err(|e| e.to_string())?;

    let apps = store
        .scan_applications("member_onboarding")
        .await
        .map_err(|e| e.to_string())?;
    if apps[0].updated_at != "2026-03-01T12:00:00.000Z" {
        return Err(format!("updated_at not stamped: {}", apps[0].updated_at));
    }
    Ok(())
}

async fn update_history_missing_id_errors<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    match store
        .update_application_history("nope", Vec::new(), "2026-01-01T00:00:00.000Z")
        .await
    {
        Err(StorageError::ApplicationNotFound { id }) => {
            if id != "nope" {
                return Err("ApplicationNotFound carries wrong id".to_string());
            }
            Ok(())
        }
        Err(other) => Err(format!("expected ApplicationNotFound, got: {other}")),
        Ok(()) => Err("expected ApplicationNotFound, got Ok".to_string()),
    }
}

use std::future::Future;

use super::TestResult;
use crate::MembershipStore;

pub(super) async fn run_index_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.push(TestResult::from_result(
        "indexes",
        "ensure_index_succeeds",
        ensure_index_succeeds(factory).await,
    ));
    results.push(TestResult::from_result(
        "indexes",
        "ensure_index_is_idempotent",
        ensure_index_is_idempotent(factory).await,
    ));

    results
}

async fn ensure_index_succeeds<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .ensure_index("applications", "member_email", true)
        .await
        .map_err(|e| e.to_string())
}

async fn ensure_index_is_idempotent<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .ensure_index("applications", "workflow_type", false)
        .await
        .map_err(|e| e.to_string())?;
    // Second ask for the same index must be a clean no-op.
    store
        .ensure_index("applications", "workflow_type", false)
        .await
        .map_err(|e| e.to_string())
}

//! Conformance test suite for `MembershipStore` implementations.
//!
//! This module provides a backend-agnostic test suite that any
//! `MembershipStore` implementation can run to verify correctness. The
//! suite covers:
//!
//! - **Execution records**: upsert-by-name creates, overwrites in place
//!   (never appends), find/list round-trips
//! - **Stage table**: keyed upsert and delete, order-sorted listing,
//!   isolation across workflow types
//! - **Applications**: workflow-scoped scan, history replacement,
//!   missing-id errors
//! - **Indexes**: idempotent ensure
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function
//! that creates a fresh, empty store instance for each test:
//!
//! ```ignore
//! use quorum_storage::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn file_store_conformance() {
//!     let report = run_conformance_suite(|| async {
//!         create_test_file_store().await
//!     }).await;
//!     assert!(report.failed == 0, "{report}");
//! }
//! ```

mod applications;
mod executions;
mod indexes;
mod stages;

use std::fmt;
use std::future::Future;

use crate::record::{ApplicationRecord, ExecutionRecord, ExecutionStatus, StageTransitionRecord};
use crate::MembershipStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "executions", "stages").
    pub category: String,
    /// Test name (e.g. "upsert_overwrites_in_place").
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn pass(category: &str, name: &str) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(category: &str, name: &str, msg: String) -> Self {
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed: false,
            message: Some(msg),
        }
    }

    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        match result {
            Ok(()) => Self::pass(category, name),
            Err(msg) => Self::fail(category, name, msg),
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a store backend.
///
/// The `factory` function is called once per test to create a fresh, empty
/// store instance, ensuring test isolation.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: MembershipStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();

    results.extend(executions::run_execution_tests(&factory).await);
    results.extend(stages::run_stage_tests(&factory).await);
    results.extend(applications::run_application_tests(&factory).await);
    results.extend(indexes::run_index_tests(&factory).await);

    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();

    ConformanceReport {
        results,
        passed,
        failed: total - passed,
        total,
    }
}

// ── Helpers: record constructors with sensible defaults ──────────────────────

fn make_execution(name: &str, status: ExecutionStatus) -> ExecutionRecord {
    ExecutionRecord {
        name: name.to_string(),
        executed_at: "2026-01-01T00:00:00.000Z".to_string(),
        execution_time_ms: 12,
        status,
        error: match status {
            ExecutionStatus::Failed => Some("boom".to_string()),
            _ => None,
        },
    }
}

fn make_transition(
    workflow_type: &str,
    current_stage: &str,
    next_stage: &str,
    order: i64,
) -> StageTransitionRecord {
    StageTransitionRecord {
        workflow_type: workflow_type.to_string(),
        current_stage: current_stage.to_string(),
        next_stage: next_stage.to_string(),
        order,
        approval_stage: format!("{current_stage} review"),
        is_active: true,
        description: String::new(),
    }
}

fn make_application(id: &str, workflow_type: &str) -> ApplicationRecord {
    ApplicationRecord {
        id: id.to_string(),
        member_name: "Test Member".to_string(),
        workflow_type: workflow_type.to_string(),
        current_stage: "committee".to_string(),
        stage_history: Vec::new(),
        updated_at: "2026-01-01T00:00:00.000Z".to_string(),
    }
}

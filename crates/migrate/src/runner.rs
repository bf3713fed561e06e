//! Migration runner.
//!
//! Walks an ordered registry of migration units against a store, skipping
//! units whose execution record is already `completed`, executing the rest
//! in registry order, and upserting one execution record per attempt. The
//! record write happens after the unit body and is not atomic with it;
//! the unit idempotence contract covers the gap.

use std::time::Instant;

use quorum_storage::{ExecutionRecord, ExecutionStatus, MembershipStore};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::MigrationError;
use crate::now_rfc3339;
use crate::registry::MigrationRegistry;
use crate::unit::RevertOutcome;

/// Names touched by one `run` call, in registry order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub executed: Vec<String>,
    pub skipped: Vec<String>,
}

/// Result of a `rollback_last` call.
#[derive(Debug, Clone, Serialize)]
pub enum RollbackReport {
    /// No completed migration exists -- an expected steady state, not an
    /// error.
    Nothing,
    /// The named migration was reverted and its record flipped to
    /// `rolled_back`.
    RolledBack {
        name: String,
        outcome: RevertOutcome,
    },
}

/// Aggregate counts by status plus the full record list ordered by
/// `executed_at`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub rolled_back: usize,
    pub migrations: Vec<ExecutionRecord>,
}

/// Executes migration registries against a single store handle.
///
/// Single-writer: exactly one runner process is assumed to execute
/// against a given store at a time. Execution is strictly sequential in
/// registry order; there is no parallelism across units, no timeout, and
/// no cancellation -- a run either completes the remaining list or aborts
/// on first failure.
pub struct MigrationRunner<S> {
    store: S,
}

impl<S: MembershipStore> MigrationRunner<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply every pending unit in registry order.
    ///
    /// A unit with a `completed` record is skipped. A `failed` or
    /// `rolled_back` record does not block re-execution: failures get
    /// at-least-once re-attempt semantics across process restarts, and a
    /// rolled-back migration is re-applied by the next run.
    ///
    /// On the first failing unit, the failure is recorded (status
    /// `failed`, error message, duration) and
    /// [`MigrationError::Execution`] is returned; units after it are not
    /// attempted in this run.
    pub async fn run(&self, registry: &MigrationRegistry<S>) -> Result<RunReport, MigrationError> {
        let mut executed = Vec::new();
        let mut skipped = Vec::new();

        for unit in registry.iter() {
            let name = unit.name();

            if self.has_been_executed(name).await? {
                skipped.push(name.to_string());
                continue;
            }

            info!(migration = name, "applying migration");
            let started = Instant::now();
            let result = unit.apply(&self.store).await;
            let execution_time_ms = started.elapsed().as_millis() as i64;
            let executed_at = now_rfc3339();

            match result {
                Ok(()) => {
                    self.store
                        .upsert_execution(ExecutionRecord {
                            name: name.to_string(),
                            executed_at,
                            execution_time_ms,
                            status: ExecutionStatus::Completed,
                            error: None,
                        })
                        .await?;
                    info!(migration = name, execution_time_ms, "migration completed");
                    executed.push(name.to_string());
                }
                Err(e) => {
                    let message = e.to_string();
                    self.store
                        .upsert_execution(ExecutionRecord {
                            name: name.to_string(),
                            executed_at,
                            execution_time_ms,
                            status: ExecutionStatus::Failed,
                            error: Some(message.clone()),
                        })
                        .await?;
                    warn!(
                        migration = name,
                        error = %message,
                        "migration failed; aborting run"
                    );
                    return Err(MigrationError::Execution {
                        name: name.to_string(),
                        message,
                    });
                }
            }
        }

        Ok(RunReport { executed, skipped })
    }

    /// Roll back the single most recently executed completed migration.
    ///
    /// The target is resolved by `executed_at`, NOT by registry position.
    /// The two can disagree when the registry was reordered between
    /// releases; recency matches what actually happened to the store, so
    /// recency wins. Repeated calls roll back progressively earlier
    /// migrations one at a time.
    ///
    /// On revert failure the record is left at `completed` (rollback
    /// attempted but not applied), so a retry is safe.
    pub async fn rollback_last(
        &self,
        registry: &MigrationRegistry<S>,
    ) -> Result<RollbackReport, MigrationError> {
        let completed = self
            .store
            .list_executions()
            .await?
            .into_iter()
            .filter(|r| r.status == ExecutionStatus::Completed)
            .max_by(|a, b| a.executed_at.cmp(&b.executed_at));

        let Some(mut record) = completed else {
            info!("no completed migrations to roll back");
            return Ok(RollbackReport::Nothing);
        };

        let Some(unit) = registry.find(&record.name) else {
            return Err(MigrationError::UnknownMigration { name: record.name });
        };

        info!(migration = record.name.as_str(), "rolling back migration");
        let outcome = unit.revert(&self.store).await?;

        record.status = ExecutionStatus::RolledBack;
        self.store.upsert_execution(record.clone()).await?;

        if outcome.is_lossy() {
            warn!(
                migration = record.name.as_str(),
                unrestored = outcome.unrestored.len(),
                "rollback applied but could not restore all historical records"
            );
        }

        Ok(RollbackReport::RolledBack {
            name: record.name,
            outcome,
        })
    }

    /// Aggregate counts by status plus all records ordered by
    /// `executed_at`. Pure read, no side effects.
    pub async fn status(&self) -> Result<StatusReport, MigrationError> {
        let mut migrations = self.store.list_executions().await?;
        migrations.sort_by(|a, b| a.executed_at.cmp(&b.executed_at));

        let completed = count(&migrations, ExecutionStatus::Completed);
        let failed = count(&migrations, ExecutionStatus::Failed);
        let rolled_back = count(&migrations, ExecutionStatus::RolledBack);

        Ok(StatusReport {
            total: migrations.len(),
            completed,
            failed,
            rolled_back,
            migrations,
        })
    }

    /// Read-only idempotence probe: has this name been completed?
    pub async fn has_been_executed(&self, name: &str) -> Result<bool, MigrationError> {
        Ok(self
            .store
            .find_execution(name)
            .await?
            .is_some_and(|r| r.status == ExecutionStatus::Completed))
    }
}

fn count(records: &[ExecutionRecord], status: ExecutionStatus) -> usize {
    records.iter().filter(|r| r.status == status).count()
}

use serde::{Deserialize, Serialize};

/// Outcome of a migration's last recorded attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Failed,
    RolledBack,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::RolledBack => write!(f, "rolled_back"),
        }
    }
}

/// The durable audit row for one migration's last known attempt.
///
/// There is at most one record per `name` -- the record is overwritten in
/// place on retry, so it always reflects the latest attempt's outcome.
/// Records are never deleted; rollback flips `status` to `RolledBack`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Unique migration identifier. Sortable timestamp-prefixed by
    /// convention (`001-...`, `002-...`); uniqueness is the idempotence key.
    pub name: String,
    /// ISO 8601 / RFC 3339 timestamp string of the attempt.
    pub executed_at: String,
    /// Wall-clock duration of the attempt in milliseconds.
    pub execution_time_ms: i64,
    pub status: ExecutionStatus,
    /// Present only when `status` is `Failed`.
    pub error: Option<String>,
}

/// One row of the ordered approval chain for a named workflow.
///
/// Keyed by `(workflow_type, current_stage)`. The active rows for a
/// workflow type form a single linear chain from the initial stage to the
/// terminal stage, with `order` contiguous from 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTransitionRecord {
    pub workflow_type: String,
    pub current_stage: String,
    pub next_stage: String,
    /// Position along the chain. Positive, strictly increasing.
    pub order: i64,
    /// Human label shown to approvers (e.g. "Board Review").
    pub approval_stage: String,
    pub is_active: bool,
    pub description: String,
}

/// A per-application record of one workflow stage that was reached.
///
/// `order` is the numeric position of the stage at the time of recording.
/// Stage-table migrations renumber these entries so the approval trail
/// stays unambiguous against the current chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageHistoryEntry {
    pub stage: String,
    pub order: i64,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub recorded_at: String,
    pub actor: String,
}

/// A member application moving through an approval workflow.
///
/// The migration engine touches only `stage_history` (and `updated_at`
/// when it writes); the remaining fields belong to the surrounding
/// membership application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: String,
    pub member_name: String,
    pub workflow_type: String,
    pub current_stage: String,
    pub stage_history: Vec<StageHistoryEntry>,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub updated_at: String,
}

/// A secondary index a backend has been asked to maintain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub collection: String,
    pub field: String,
    pub unique: bool,
}

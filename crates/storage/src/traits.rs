use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{ApplicationRecord, ExecutionRecord, StageHistoryEntry, StageTransitionRecord};

/// The document-store contract the migration engine depends on.
///
/// A `MembershipStore` implementation provides durable storage for
/// migration execution records, the workflow stage table, and member
/// applications. The surface is minimal: find-by-key, upsert-by-key,
/// and bulk scan. The engine depends on nothing else -- not on any
/// particular query language, and not on transactions.
///
/// ## No transaction surface
///
/// A migration body executes first and its execution record is written
/// after; the engine never couples the two. This trait therefore offers
/// no snapshot/commit lifecycle. Callers must not assume a mutation and
/// a subsequent record write are atomic.
///
/// ## Single-writer assumption
///
/// Exactly one migration runner process is assumed to mutate a given
/// store at a time. Implementations are not required to serialize
/// concurrent runners; upsert-by-name on execution records is the sole
/// shared mutable resource.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync + 'static` to cross async task
/// boundaries.
#[async_trait]
pub trait MembershipStore: Send + Sync + 'static {
    // ── Execution records (keyed by migration name) ──────────────────────

    /// Look up the execution record for a migration name.
    ///
    /// Absence is a normal state (the migration has never been attempted),
    /// so this returns `Ok(None)` rather than an error.
    async fn find_execution(&self, name: &str) -> Result<Option<ExecutionRecord>, StorageError>;

    /// Insert or overwrite the execution record with the record's name as
    /// the key. Overwrite-in-place, never append: at most one record per
    /// name exists afterwards.
    async fn upsert_execution(&self, record: ExecutionRecord) -> Result<(), StorageError>;

    /// All execution records, in unspecified order. Callers sort.
    async fn list_executions(&self) -> Result<Vec<ExecutionRecord>, StorageError>;

    // ── Workflow stage table (keyed by (workflow_type, current_stage)) ───

    /// Look up one transition row by its key.
    async fn find_transition(
        &self,
        workflow_type: &str,
        current_stage: &str,
    ) -> Result<Option<StageTransitionRecord>, StorageError>;

    /// Insert or overwrite the transition row keyed by the record's
    /// `(workflow_type, current_stage)`.
    async fn upsert_transition(&self, record: StageTransitionRecord) -> Result<(), StorageError>;

    /// Delete one transition row.
    ///
    /// Returns `Err(StorageError::TransitionNotFound)` if no row with the
    /// given key exists.
    async fn delete_transition(
        &self,
        workflow_type: &str,
        current_stage: &str,
    ) -> Result<(), StorageError>;

    /// All transition rows for a workflow type, sorted by `order`.
    async fn list_transitions(
        &self,
        workflow_type: &str,
    ) -> Result<Vec<StageTransitionRecord>, StorageError>;

    // ── Applications ─────────────────────────────────────────────────────

    /// Bulk scan of every application in the given workflow.
    async fn scan_applications(
        &self,
        workflow_type: &str,
    ) -> Result<Vec<ApplicationRecord>, StorageError>;

    /// Insert or overwrite an application keyed by its `id`.
    ///
    /// The migration engine never creates applications -- this exists for
    /// the surrounding application, bootstrap tooling, and tests.
    async fn upsert_application(&self, record: ApplicationRecord) -> Result<(), StorageError>;

    /// Replace an application's stage history and stamp `updated_at`.
    ///
    /// Callers are responsible for no-op write avoidance -- only call this
    /// when the history actually changed.
    ///
    /// Returns `Err(StorageError::ApplicationNotFound)` if no application
    /// with the given id exists.
    async fn update_application_history(
        &self,
        id: &str,
        history: Vec<StageHistoryEntry>,
        updated_at: &str,
    ) -> Result<(), StorageError>;

    // ── Indexes ──────────────────────────────────────────────────────────

    /// Ensure a secondary index exists on `collection.field`.
    ///
    /// Idempotent: asking for an index that already exists is a no-op.
    async fn ensure_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> Result<(), StorageError>;
}

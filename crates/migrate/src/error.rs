use quorum_storage::StorageError;

use crate::stage::ChainError;

/// Errors surfaced by the migration engine.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// A unit's `apply` failed. Fatal to the run: the failure is recorded
    /// as `failed` before this error propagates, and units after the
    /// failing one are never attempted in that run.
    #[error("migration '{name}' failed: {message}")]
    Execution { name: String, message: String },

    /// Rollback was requested for a migration name that is not present in
    /// the supplied registry (e.g. its source was deleted). Fatal to the
    /// rollback call only; the execution record is left untouched.
    #[error("unknown migration '{name}': not present in the supplied registry")]
    UnknownMigration { name: String },

    /// Two units with the same name were registered. Names are the
    /// idempotence key and must be unique.
    #[error("duplicate migration name '{name}' in registry")]
    DuplicateName { name: String },

    /// The workflow stage table violates the linear-chain invariant.
    #[error("stage chain violation: {0}")]
    Chain(#[from] ChainError),

    /// Store failure, flattened to a message at the engine boundary.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<StorageError> for MigrationError {
    fn from(e: StorageError) -> Self {
        MigrationError::Storage(e.to_string())
    }
}

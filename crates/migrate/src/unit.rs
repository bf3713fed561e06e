use async_trait::async_trait;
use quorum_storage::MembershipStore;
use serde::Serialize;

use crate::error::MigrationError;

/// A named, ordered forward/backward change to persisted state.
///
/// ## Idempotence contract
///
/// `apply` MUST be safe to invoke against a store that is already in the
/// target state: upsert by natural key rather than insert, check for
/// existence before creating. This is a hard contract, not a convention.
/// The runner writes the execution record only AFTER `apply` returns --
/// if that record write fails, the change has been applied but is marked
/// not-completed, and the next run will invoke `apply` again.
///
/// ## Ordering
///
/// Registry position defines application order. A unit may assume every
/// earlier unit in the registry has been applied to the target store --
/// linear history, no dependency graph. The order is part of the deployed
/// contract and must never change after release.
///
/// ## Side effects
///
/// Keep `apply` side effects confined to the store itself. The engine
/// assumes a single writer but cannot prevent a racing second runner from
/// double-executing a unit; store writes are idempotent under that race,
/// external effects (sending mail, calling third parties) are not.
#[async_trait]
pub trait MigrationUnit<S: MembershipStore>: Send + Sync {
    /// Unique migration identifier; matches the execution record key.
    fn name(&self) -> &str;

    /// One line for operators.
    fn description(&self) -> &str;

    /// Perform the forward change.
    async fn apply(&self, store: &S) -> Result<(), MigrationError>;

    /// Perform the inverse change, best-effort.
    ///
    /// Some reverts cannot fully restore data the forward migration
    /// deleted. Such a revert must report what it could not restore in
    /// the returned [`RevertOutcome`] rather than silently fabricate or
    /// drop it.
    async fn revert(&self, store: &S) -> Result<RevertOutcome, MigrationError>;
}

/// Partial-success result of a `revert`.
///
/// An `Ok` revert with a non-empty `unrestored` list means the store is
/// back on the previous chain definition, but some historical records
/// destroyed by the forward migration could not be reconstructed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RevertOutcome {
    pub unrestored: Vec<UnrestoredEntry>,
}

impl RevertOutcome {
    /// A revert that restored everything.
    pub fn clean() -> Self {
        Self::default()
    }

    pub fn is_lossy(&self) -> bool {
        !self.unrestored.is_empty()
    }
}

/// One historical record a revert could not bring back.
#[derive(Debug, Clone, Serialize)]
pub struct UnrestoredEntry {
    pub application_id: String,
    pub stage: String,
    pub order: i64,
    pub reason: String,
}

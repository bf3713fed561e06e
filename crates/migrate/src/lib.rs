//! Versioned migration execution engine for the membership store.
//!
//! Applies an ordered list of migration units exactly once, records every
//! attempt durably, supports rollback of the most recent migration, and
//! reports aggregate status. The engine re-evaluates the full unit list on
//! every invocation (each process restart runs it again), skipping units
//! whose execution record is already `completed`.
//!
//! The stage module contains the workflow stage migrator: migration units
//! that evolve the ordered approval chain of a workflow while renumbering
//! the stage histories already recorded on member applications.

pub mod catalog;
pub mod error;
pub mod registry;
pub mod runner;
pub mod stage;
pub mod unit;

pub use error::MigrationError;
pub use registry::{MigrationRegistry, RegistryBuilder};
pub use runner::{MigrationRunner, RollbackReport, RunReport, StatusReport};
pub use unit::{MigrationUnit, RevertOutcome, UnrestoredEntry};

/// Generate an RFC 3339 timestamp with millisecond precision.
///
/// Millisecond precision matters: rollback resolves its target by the
/// lexicographic maximum of `executed_at`, and several migrations can
/// complete within the same second of one run.
pub(crate) fn now_rfc3339() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        now.year(),
        now.month() as u8,
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.millisecond()
    )
}

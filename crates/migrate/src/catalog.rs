//! The deployed migration catalog for the membership store.
//!
//! Registry order is part of the deployed contract: released units are
//! never reordered or renamed, new units are appended with the next
//! number prefix.

use async_trait::async_trait;
use quorum_storage::{MembershipStore, StageTransitionRecord};

use crate::error::MigrationError;
use crate::registry::MigrationRegistry;
use crate::stage::migrator::{StageAppend, StageRemoval};
use crate::stage::MEMBER_ONBOARDING;
use crate::unit::{MigrationUnit, RevertOutcome};

/// Stage names of the member onboarding chain.
pub const COMMITTEE: &str = "committee";
pub const BOARD: &str = "board";
pub const CEO: &str = "ceo";
pub const PAYMENT: &str = "payment";
/// Terminal stage: applications land here, no transition row of its own.
pub const APPROVED: &str = "approved";

fn onboarding_transition(
    current: &str,
    next: &str,
    order: i64,
    label: &str,
    description: &str,
) -> StageTransitionRecord {
    StageTransitionRecord {
        workflow_type: MEMBER_ONBOARDING.to_string(),
        current_stage: current.to_string(),
        next_stage: next.to_string(),
        order,
        approval_stage: label.to_string(),
        is_active: true,
        description: description.to_string(),
    }
}

/// `001-create-indexes` -- lookup indexes on the applications and stage
/// transition collections. `ensure_index` is idempotent by contract.
pub struct CreateIndexes;

#[async_trait]
impl<S: MembershipStore> MigrationUnit<S> for CreateIndexes {
    fn name(&self) -> &str {
        "001-create-indexes"
    }

    fn description(&self) -> &str {
        "create lookup indexes on applications and stage transitions"
    }

    async fn apply(&self, store: &S) -> Result<(), MigrationError> {
        store.ensure_index("applications", "member_email", true).await?;
        store.ensure_index("applications", "workflow_type", false).await?;
        store
            .ensure_index("stage_transitions", "workflow_type", false)
            .await?;
        Ok(())
    }

    async fn revert(&self, _store: &S) -> Result<RevertOutcome, MigrationError> {
        // Index removal is left to the operator; a stale lookup index is
        // never required for correctness.
        Ok(RevertOutcome::clean())
    }
}

/// `002-add-approval-order` -- seed the ordered member-onboarding approval
/// chain: committee(1) -> board(2) -> ceo(3).
pub struct SeedApprovalChain;

impl SeedApprovalChain {
    fn rows() -> [StageTransitionRecord; 3] {
        [
            onboarding_transition(
                COMMITTEE,
                BOARD,
                1,
                "Committee Review",
                "membership committee screens the application",
            ),
            onboarding_transition(
                BOARD,
                CEO,
                2,
                "Board Review",
                "board votes on the committee recommendation",
            ),
            onboarding_transition(
                CEO,
                APPROVED,
                3,
                "CEO Review",
                "chief executive signs off",
            ),
        ]
    }
}

#[async_trait]
impl<S: MembershipStore> MigrationUnit<S> for SeedApprovalChain {
    fn name(&self) -> &str {
        "002-add-approval-order"
    }

    fn description(&self) -> &str {
        "seed the ordered member-onboarding approval chain"
    }

    async fn apply(&self, store: &S) -> Result<(), MigrationError> {
        for row in Self::rows() {
            store.upsert_transition(row).await?;
        }
        Ok(())
    }

    async fn revert(&self, store: &S) -> Result<RevertOutcome, MigrationError> {
        // Unseed the rows this unit created. Recorded histories stay in
        // place -- they describe approvals that really happened.
        for row in Self::rows() {
            if store
                .find_transition(&row.workflow_type, &row.current_stage)
                .await?
                .is_some()
            {
                store
                    .delete_transition(&row.workflow_type, &row.current_stage)
                    .await?;
            }
        }
        Ok(RevertOutcome::clean())
    }
}

/// `003-remove-board-stage` -- the board no longer reviews applications;
/// the chain becomes committee(1) -> ceo(2) and recorded histories are
/// renumbered to match.
pub fn remove_board_stage() -> StageRemoval {
    StageRemoval::new(
        "003-remove-board-stage",
        "drop the board review stage and renumber recorded approvals",
        onboarding_transition(
            BOARD,
            CEO,
            2,
            "Board Review",
            "board votes on the committee recommendation",
        ),
    )
}

/// `004-add-payment-stage` -- approved applications now wait for the
/// joining fee; the chain becomes committee(1) -> ceo(2) -> payment(3).
pub fn add_payment_stage() -> StageAppend {
    StageAppend::new(
        "004-add-payment-stage",
        "append a payment confirmation stage after ceo review",
        MEMBER_ONBOARDING,
        PAYMENT,
        "Payment Confirmation",
        "joining fee received and reconciled",
    )
}

/// The full deployed unit list, in release order.
pub fn builtin_registry<S: MembershipStore>() -> Result<MigrationRegistry<S>, MigrationError> {
    MigrationRegistry::builder()
        .register(CreateIndexes)
        .register(SeedApprovalChain)
        .register(remove_board_stage())
        .register(add_payment_stage())
        .build()
}

#[cfg(test)]
mod tests {
    use quorum_storage::{
        ApplicationRecord, ExecutionStatus, MemoryStore, StageHistoryEntry,
    };

    use super::*;
    use crate::runner::MigrationRunner;
    use crate::stage::load_chain;

    fn entry(stage: &str, order: i64) -> StageHistoryEntry {
        StageHistoryEntry {
            stage: stage.to_string(),
            order,
            recorded_at: "2026-01-10T10:00:00.000Z".to_string(),
            actor: "chair@example.org".to_string(),
        }
    }

    #[tokio::test]
    async fn full_catalog_converges_an_old_store() {
        let store = MemoryStore::new();
        // An application approved under the original three-stage chain,
        // recorded before 003 and 004 shipped.
        store
            .upsert_application(ApplicationRecord {
                id: "app-legacy".to_string(),
                member_name: "Grace".to_string(),
                workflow_type: MEMBER_ONBOARDING.to_string(),
                current_stage: APPROVED.to_string(),
                stage_history: vec![
                    entry(COMMITTEE, 1),
                    entry(BOARD, 2),
                    entry(CEO, 3),
                ],
                updated_at: "2026-01-10T10:00:00.000Z".to_string(),
            })
            .await
            .unwrap();

        let runner = MigrationRunner::new(store);
        let registry = builtin_registry().unwrap();
        let report = runner.run(&registry).await.unwrap();

        assert_eq!(
            report.executed,
            vec![
                "001-create-indexes",
                "002-add-approval-order",
                "003-remove-board-stage",
                "004-add-payment-stage",
            ]
        );

        let chain = load_chain(runner.store(), MEMBER_ONBOARDING).await.unwrap();
        chain.validate().unwrap();
        assert_eq!(chain.stage_names(), vec![COMMITTEE, CEO, PAYMENT]);

        // The legacy history lost its board entry and was renumbered.
        let apps = runner
            .store()
            .scan_applications(MEMBER_ONBOARDING)
            .await
            .unwrap();
        assert_eq!(
            apps[0].stage_history,
            vec![entry(COMMITTEE, 1), entry(CEO, 2)]
        );

        let status = runner.status().await.unwrap();
        assert_eq!(status.total, 4);
        assert_eq!(status.completed, 4);
        assert_eq!(status.failed, 0);
        assert_eq!(status.rolled_back, 0);
    }

    #[tokio::test]
    async fn second_catalog_run_is_a_pure_skip() {
        let runner = MigrationRunner::new(MemoryStore::new());
        let registry = builtin_registry().unwrap();
        runner.run(&registry).await.unwrap();

        let report = runner.run(&registry).await.unwrap();
        assert!(report.executed.is_empty());
        assert_eq!(report.skipped.len(), 4);
    }

    #[tokio::test]
    async fn rollback_last_unwinds_the_payment_stage() {
        let runner = MigrationRunner::new(MemoryStore::new());
        let registry = builtin_registry().unwrap();
        runner.run(&registry).await.unwrap();

        runner.rollback_last(&registry).await.unwrap();

        let chain = load_chain(runner.store(), MEMBER_ONBOARDING).await.unwrap();
        assert_eq!(chain.stage_names(), vec![COMMITTEE, CEO]);
        let record = runner
            .store()
            .find_execution("004-add-payment-stage")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.status, ExecutionStatus::RolledBack);
    }
}

//! Stage-table migration units.
//!
//! These units evolve the ordered approval chain of a workflow and,
//! symmetrically, rewrite the stage histories already recorded on member
//! applications so they stay consistent with the new numbering. Without
//! the history rewrite, an approval trail recorded under the old chain
//! becomes ambiguous against the new one.

use std::collections::BTreeMap;

use async_trait::async_trait;
use quorum_storage::{MembershipStore, StageHistoryEntry, StageTransitionRecord};
use tracing::info;

use crate::error::MigrationError;
use crate::now_rfc3339;
use crate::stage::load_chain;
use crate::unit::{MigrationUnit, RevertOutcome, UnrestoredEntry};

/// Remove one stage from a workflow chain.
///
/// `apply` re-links the predecessor around the removed stage, deletes its
/// row, renumbers the remaining rows contiguously, then rewrites every
/// application's stage history: entries for the removed stage are
/// deleted, retained entries get the new numbering. Applications whose
/// history did not change are not written.
///
/// `revert` restores the transition row and the old numbering, but the
/// history entries deleted by `apply` cannot be reconstructed -- their
/// timestamps and actors are gone. The revert is lossy and reports each
/// application it could not fully restore in its [`RevertOutcome`].
pub struct StageRemoval {
    name: String,
    description: String,
    /// The removed row as it existed before this migration shipped. The
    /// revert path needs the full definition to reinsert it.
    removed: StageTransitionRecord,
}

impl StageRemoval {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        removed: StageTransitionRecord,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            removed,
        }
    }
}

#[async_trait]
impl<S: MembershipStore> MigrationUnit<S> for StageRemoval {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn apply(&self, store: &S) -> Result<(), MigrationError> {
        let workflow = &self.removed.workflow_type;
        let stage = &self.removed.current_stage;
        let chain = load_chain(store, workflow).await?;

        if let Some(row) = chain.transitions.iter().find(|t| t.current_stage == *stage) {
            // Re-link the predecessor around the removed stage.
            if let Some(pred) = chain.transitions.iter().find(|t| t.next_stage == *stage) {
                let mut pred = pred.clone();
                pred.next_stage = row.next_stage.clone();
                store.upsert_transition(pred).await?;
            }
            store.delete_transition(workflow, stage).await?;
            renumber_contiguous(store, workflow).await?;
        }

        // Run the history rewrite even when the row was already gone: a
        // retried apply must still converge histories to the table.
        let rewritten = rewrite_histories(store, workflow).await?;
        info!(
            workflow = workflow.as_str(),
            stage = stage.as_str(),
            rewritten,
            "stage removed and histories renumbered"
        );

        load_chain(store, workflow).await?.validate()?;
        Ok(())
    }

    async fn revert(&self, store: &S) -> Result<RevertOutcome, MigrationError> {
        let workflow = &self.removed.workflow_type;
        let stage = &self.removed.current_stage;
        let chain = load_chain(store, workflow).await?;

        if !chain.contains(stage) {
            // Shift the rows that took over the removed stage's position
            // and everything after it, then reinsert the original row.
            for row in &chain.transitions {
                if row.order >= self.removed.order {
                    let mut row = row.clone();
                    row.order += 1;
                    store.upsert_transition(row).await?;
                }
            }
            if let Some(pred) = chain
                .transitions
                .iter()
                .find(|t| t.order == self.removed.order - 1)
            {
                let mut pred = pred.clone();
                pred.next_stage = stage.clone();
                store.upsert_transition(pred).await?;
            }
            store.upsert_transition(self.removed.clone()).await?;
            rewrite_histories(store, workflow).await?;
        }

        // Entries for the restored stage were deleted by apply and cannot
        // be reconstructed. An application that progressed past the
        // restored stage must have carried one; report each such loss.
        let mut outcome = RevertOutcome::clean();
        for app in store.scan_applications(workflow).await? {
            let passed_beyond = app.stage_history.iter().any(|e| e.order > self.removed.order);
            let has_entry = app.stage_history.iter().any(|e| e.stage == *stage);
            if passed_beyond && !has_entry {
                outcome.unrestored.push(UnrestoredEntry {
                    application_id: app.id.clone(),
                    stage: stage.clone(),
                    order: self.removed.order,
                    reason: "history entry was deleted by the forward migration; \
                             its timestamp and actor are not recoverable"
                        .to_string(),
                });
            }
        }

        load_chain(store, workflow).await?.validate()?;
        Ok(outcome)
    }
}

/// Append a stage at the tail of a workflow chain.
///
/// `apply` re-links the current tail to the new stage and inserts the new
/// row advancing to the old terminal stage. Existing numbering is
/// untouched, so no history rewrite is needed.
///
/// `revert` removes the appended stage again. Any approvals recorded
/// against it while it existed are dropped from application histories and
/// reported as unrestorable.
pub struct StageAppend {
    name: String,
    description: String,
    workflow_type: String,
    stage: String,
    approval_stage: String,
    stage_description: String,
}

impl StageAppend {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        workflow_type: impl Into<String>,
        stage: impl Into<String>,
        approval_stage: impl Into<String>,
        stage_description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            workflow_type: workflow_type.into(),
            stage: stage.into(),
            approval_stage: approval_stage.into(),
            stage_description: stage_description.into(),
        }
    }
}

#[async_trait]
impl<S: MembershipStore> MigrationUnit<S> for StageAppend {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn apply(&self, store: &S) -> Result<(), MigrationError> {
        let chain = load_chain(store, &self.workflow_type).await?;

        if !chain.contains(&self.stage) {
            let Some(tail) = chain.transitions.last() else {
                return Err(crate::stage::ChainError::Empty {
                    workflow_type: self.workflow_type.clone(),
                }
                .into());
            };
            let terminal = tail.next_stage.clone();

            let mut new_tail = tail.clone();
            new_tail.next_stage = self.stage.clone();
            store.upsert_transition(new_tail).await?;

            store
                .upsert_transition(StageTransitionRecord {
                    workflow_type: self.workflow_type.clone(),
                    current_stage: self.stage.clone(),
                    next_stage: terminal,
                    order: tail.order + 1,
                    approval_stage: self.approval_stage.clone(),
                    is_active: true,
                    description: self.stage_description.clone(),
                })
                .await?;
            info!(
                workflow = self.workflow_type.as_str(),
                stage = self.stage.as_str(),
                "stage appended to chain"
            );
        }

        load_chain(store, &self.workflow_type).await?.validate()?;
        Ok(())
    }

    async fn revert(&self, store: &S) -> Result<RevertOutcome, MigrationError> {
        let chain = load_chain(store, &self.workflow_type).await?;
        let mut outcome = RevertOutcome::clean();

        if let Some(row) = chain
            .transitions
            .iter()
            .find(|t| t.current_stage == self.stage)
        {
            if let Some(pred) = chain.transitions.iter().find(|t| t.next_stage == self.stage) {
                let mut pred = pred.clone();
                pred.next_stage = row.next_stage.clone();
                store.upsert_transition(pred).await?;
            }
            store.delete_transition(&self.workflow_type, &self.stage).await?;

            // Approvals recorded against the appended stage are dropped;
            // re-applying the forward migration will not bring them back.
            let stamp = now_rfc3339();
            for app in store.scan_applications(&self.workflow_type).await? {
                let dropped: Vec<StageHistoryEntry> = app
                    .stage_history
                    .iter()
                    .filter(|e| e.stage == self.stage)
                    .cloned()
                    .collect();
                if dropped.is_empty() {
                    continue;
                }
                let retained: Vec<StageHistoryEntry> = app
                    .stage_history
                    .iter()
                    .filter(|e| e.stage != self.stage)
                    .cloned()
                    .collect();
                store
                    .update_application_history(&app.id, retained, &stamp)
                    .await?;
                for entry in dropped {
                    outcome.unrestored.push(UnrestoredEntry {
                        application_id: app.id.clone(),
                        stage: entry.stage,
                        order: entry.order,
                        reason: "approval recorded against the removed stage was dropped"
                            .to_string(),
                    });
                }
            }
        }

        load_chain(store, &self.workflow_type).await?.validate()?;
        Ok(outcome)
    }
}

/// Reassign contiguous orders (1..=n) to a workflow's rows, writing only
/// rows whose order changed.
async fn renumber_contiguous<S: MembershipStore>(
    store: &S,
    workflow_type: &str,
) -> Result<(), MigrationError> {
    let chain = load_chain(store, workflow_type).await?;
    for (position, row) in chain.transitions.iter().enumerate() {
        let expected = (position + 1) as i64;
        if row.order != expected {
            let mut row = row.clone();
            row.order = expected;
            store.upsert_transition(row).await?;
        }
    }
    Ok(())
}

/// Converge every application's stage history to the current table: drop
/// entries whose stage left the chain, renumber retained entries, persist
/// only applications whose history actually changed. Returns the number
/// of applications written.
async fn rewrite_histories<S: MembershipStore>(
    store: &S,
    workflow_type: &str,
) -> Result<usize, MigrationError> {
    let chain = load_chain(store, workflow_type).await?;
    let orders: BTreeMap<String, i64> = chain
        .transitions
        .iter()
        .map(|t| (t.current_stage.clone(), t.order))
        .collect();

    let stamp = now_rfc3339();
    let mut written = 0;
    for app in store.scan_applications(workflow_type).await? {
        let rewritten: Vec<StageHistoryEntry> = app
            .stage_history
            .iter()
            .filter(|e| orders.contains_key(&e.stage))
            .map(|e| {
                let mut e = e.clone();
                e.order = orders[&e.stage];
                e
            })
            .collect();
        if rewritten != app.stage_history {
            store
                .update_application_history(&app.id, rewritten, &stamp)
                .await?;
            written += 1;
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use quorum_storage::{ApplicationRecord, MemoryStore};

    use super::*;
    use crate::stage::MEMBER_ONBOARDING;

    fn transition(current: &str, next: &str, order: i64, label: &str) -> StageTransitionRecord {
        StageTransitionRecord {
            workflow_type: MEMBER_ONBOARDING.to_string(),
            current_stage: current.to_string(),
            next_stage: next.to_string(),
            order,
            approval_stage: label.to_string(),
            is_active: true,
            description: String::new(),
        }
    }

    fn entry(stage: &str, order: i64) -> StageHistoryEntry {
        StageHistoryEntry {
            stage: stage.to_string(),
            order,
            recorded_at: "2026-01-10T10:00:00.000Z".to_string(),
            actor: "chair@example.org".to_string(),
        }
    }

    fn application(id: &str, history: Vec<StageHistoryEntry>) -> ApplicationRecord {
        ApplicationRecord {
            id: id.to_string(),
            member_name: "Ada".to_string(),
            workflow_type: MEMBER_ONBOARDING.to_string(),
            current_stage: "committee".to_string(),
            stage_history: history,
            updated_at: "2026-01-10T10:00:00.000Z".to_string(),
        }
    }

    async fn seed_three_stage_chain(store: &MemoryStore) {
        for t in [
            transition("committee", "board", 1, "Committee Review"),
            transition("board", "ceo", 2, "Board Review"),
            transition("ceo", "approved", 3, "CEO Review"),
        ] {
            store.upsert_transition(t).await.unwrap();
        }
    }

    fn remove_board() -> StageRemoval {
        StageRemoval::new(
            "remove-board",
            "drop the board stage",
            transition("board", "ceo", 2, "Board Review"),
        )
    }

    async fn history_of(store: &MemoryStore, id: &str) -> Vec<StageHistoryEntry> {
        store
            .scan_applications(MEMBER_ONBOARDING)
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.id == id)
            .unwrap()
            .stage_history
    }

    #[tokio::test]
    async fn removal_relinks_deletes_and_renumbers_the_chain() {
        let store = MemoryStore::new();
        seed_three_stage_chain(&store).await;

        remove_board().apply(&store).await.unwrap();

        let chain = load_chain(&store, MEMBER_ONBOARDING).await.unwrap();
        chain.validate().unwrap();
        assert_eq!(chain.stage_names(), vec!["committee", "ceo"]);
        assert_eq!(chain.transitions[0].next_stage, "ceo");
        assert_eq!(chain.transitions[1].order, 2);
        assert_eq!(chain.transitions[1].next_stage, "approved");
    }

    #[tokio::test]
    async fn removal_rewrites_histories_to_the_new_numbering() {
        let store = MemoryStore::new();
        seed_three_stage_chain(&store).await;
        store
            .upsert_application(application(
                "app-1",
                vec![entry("board", 2), entry("ceo", 3)],
            ))
            .await
            .unwrap();

        remove_board().apply(&store).await.unwrap();

        let history = history_of(&store, "app-1").await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].stage, "ceo");
        assert_eq!(history[0].order, 2);
        // Timestamp and actor of the retained entry survive untouched.
        assert_eq!(history[0].recorded_at, "2026-01-10T10:00:00.000Z");
        assert_eq!(history[0].actor, "chair@example.org");
    }

    #[tokio::test]
    async fn removal_skips_applications_whose_history_is_unchanged() {
        let store = MemoryStore::new();
        seed_three_stage_chain(&store).await;
        store
            .upsert_application(application("touched", vec![entry("board", 2)]))
            .await
            .unwrap();
        // Never reached board; committee keeps order 1 either way.
        store
            .upsert_application(application("untouched", vec![entry("committee", 1)]))
            .await
            .unwrap();

        remove_board().apply(&store).await.unwrap();

        assert_eq!(store.history_write_count(), 1);
        assert_eq!(history_of(&store, "untouched").await, vec![entry("committee", 1)]);
    }

    #[tokio::test]
    async fn removal_is_idempotent() {
        let store = MemoryStore::new();
        seed_three_stage_chain(&store).await;
        store
            .upsert_application(application(
                "app-1",
                vec![entry("committee", 1), entry("board", 2), entry("ceo", 3)],
            ))
            .await
            .unwrap();

        let unit = remove_board();
        unit.apply(&store).await.unwrap();
        let writes_after_first = store.history_write_count();
        unit.apply(&store).await.unwrap();

        // Second apply converges without writing anything.
        assert_eq!(store.history_write_count(), writes_after_first);
        let chain = load_chain(&store, MEMBER_ONBOARDING).await.unwrap();
        assert_eq!(chain.stage_names(), vec!["committee", "ceo"]);
        assert_eq!(
            history_of(&store, "app-1").await,
            vec![entry("committee", 1), entry("ceo", 2)]
        );
    }

    #[tokio::test]
    async fn revert_restores_numbering_but_not_deleted_entries() {
        let store = MemoryStore::new();
        seed_three_stage_chain(&store).await;
        store
            .upsert_application(application(
                "app-1",
                vec![entry("board", 2), entry("ceo", 3)],
            ))
            .await
            .unwrap();

        let unit = remove_board();
        unit.apply(&store).await.unwrap();
        let outcome = unit.revert(&store).await.unwrap();

        // Table restored with the old numbering.
        let chain = load_chain(&store, MEMBER_ONBOARDING).await.unwrap();
        chain.validate().unwrap();
        assert_eq!(chain.stage_names(), vec!["committee", "board", "ceo"]);
        assert_eq!(chain.order_of("board"), Some(2));
        assert_eq!(chain.order_of("ceo"), Some(3));

        // The ceo entry is back at order 3, the board entry is gone.
        let history = history_of(&store, "app-1").await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].stage, "ceo");
        assert_eq!(history[0].order, 3);

        // The loss is reported, not silently approximated.
        assert!(outcome.is_lossy());
        assert_eq!(outcome.unrestored.len(), 1);
        assert_eq!(outcome.unrestored[0].application_id, "app-1");
        assert_eq!(outcome.unrestored[0].stage, "board");
        assert_eq!(outcome.unrestored[0].order, 2);
    }

    #[tokio::test]
    async fn revert_reports_nothing_lost_when_no_application_passed_the_stage() {
        let store = MemoryStore::new();
        seed_three_stage_chain(&store).await;
        store
            .upsert_application(application("app-1", vec![entry("committee", 1)]))
            .await
            .unwrap();

        let unit = remove_board();
        unit.apply(&store).await.unwrap();
        let outcome = unit.revert(&store).await.unwrap();

        assert!(!outcome.is_lossy());
    }

    #[tokio::test]
    async fn append_links_new_tail_stage() {
        let store = MemoryStore::new();
        store
            .upsert_transition(transition("committee", "ceo", 1, "Committee Review"))
            .await
            .unwrap();
        store
            .upsert_transition(transition("ceo", "approved", 2, "CEO Review"))
            .await
            .unwrap();

        let unit = StageAppend::new(
            "add-payment",
            "collect the joining fee after approval",
            MEMBER_ONBOARDING,
            "payment",
            "Payment Confirmation",
            "joining fee received",
        );
        unit.apply(&store).await.unwrap();
        // Idempotent re-apply.
        unit.apply(&store).await.unwrap();

        let chain = load_chain(&store, MEMBER_ONBOARDING).await.unwrap();
        chain.validate().unwrap();
        assert_eq!(chain.stage_names(), vec!["committee", "ceo", "payment"]);
        assert_eq!(chain.transitions[1].next_stage, "payment");
        assert_eq!(chain.transitions[2].next_stage, "approved");
        assert_eq!(chain.transitions[2].order, 3);
    }

    #[tokio::test]
    async fn append_revert_drops_and_reports_recorded_approvals() {
        let store = MemoryStore::new();
        store
            .upsert_transition(transition("committee", "ceo", 1, "Committee Review"))
            .await
            .unwrap();
        store
            .upsert_transition(transition("ceo", "approved", 2, "CEO Review"))
            .await
            .unwrap();

        let unit = StageAppend::new(
            "add-payment",
            "collect the joining fee after approval",
            MEMBER_ONBOARDING,
            "payment",
            "Payment Confirmation",
            "joining fee received",
        );
        unit.apply(&store).await.unwrap();

        store
            .upsert_application(application(
                "app-1",
                vec![entry("ceo", 2), entry("payment", 3)],
            ))
            .await
            .unwrap();

        let outcome = unit.revert(&store).await.unwrap();

        let chain = load_chain(&store, MEMBER_ONBOARDING).await.unwrap();
        assert_eq!(chain.stage_names(), vec!["committee", "ceo"]);
        assert_eq!(history_of(&store, "app-1").await, vec![entry("ceo", 2)]);
        assert!(outcome.is_lossy());
        assert_eq!(outcome.unrestored[0].stage, "payment");
        assert_eq!(outcome.unrestored[0].order, 3);
    }
}

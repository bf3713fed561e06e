//! Workflow stage chain: the ordered approval path of a named workflow.
//!
//! A workflow's approval path is persisted as transition rows keyed by
//! `(workflow_type, current_stage)`. The active rows form a single linear
//! chain from the initial stage to the terminal stage; `order` is
//! contiguous from 1. The chain invariant is enforced by the stage
//! migrator after every mutation, not by a runtime check on reads.

pub mod migrator;

use quorum_storage::{MembershipStore, StageTransitionRecord};

use crate::error::MigrationError;

/// Workflow type of the member onboarding approval path.
pub const MEMBER_ONBOARDING: &str = "member_onboarding";

/// Violations of the linear-chain invariant.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("workflow '{workflow_type}' has no active transitions")]
    Empty { workflow_type: String },

    #[error(
        "workflow '{workflow_type}': order not contiguous at position {position}: \
         expected {expected}, found {found}"
    )]
    NonContiguousOrder {
        workflow_type: String,
        position: usize,
        expected: i64,
        found: i64,
    },

    #[error(
        "workflow '{workflow_type}': '{current_stage}' advances to '{next_stage}', \
         which is not the stage at order {expected_order}"
    )]
    BrokenLink {
        workflow_type: String,
        current_stage: String,
        next_stage: String,
        expected_order: i64,
    },

    #[error("workflow '{workflow_type}': terminal stage '{next_stage}' re-enters the chain")]
    CyclicTerminal {
        workflow_type: String,
        next_stage: String,
    },
}

/// The active approval chain of one workflow type, sorted by `order`.
#[derive(Debug, Clone)]
pub struct StageChain {
    pub workflow_type: String,
    pub transitions: Vec<StageTransitionRecord>,
}

/// Load the active chain for a workflow type.
pub async fn load_chain<S: MembershipStore>(
    store: &S,
    workflow_type: &str,
) -> Result<StageChain, MigrationError> {
    let transitions = store
        .list_transitions(workflow_type)
        .await?
        .into_iter()
        .filter(|t| t.is_active)
        .collect();
    Ok(StageChain {
        workflow_type: workflow_type.to_string(),
        transitions,
    })
}

impl StageChain {
    /// Numeric position of a stage, if it is on the chain.
    pub fn order_of(&self, stage: &str) -> Option<i64> {
        self.transitions
            .iter()
            .find(|t| t.current_stage == stage)
            .map(|t| t.order)
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.order_of(stage).is_some()
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Stage names in chain order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.transitions
            .iter()
            .map(|t| t.current_stage.as_str())
            .collect()
    }

    /// Check the linear-chain invariant.
    ///
    /// Orders must be contiguous from 1, each row must advance to the
    /// stage holding the next order, and the last row's `next_stage` (the
    /// terminal stage) must not re-enter the chain.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.transitions.is_empty() {
            return Err(ChainError::Empty {
                workflow_type: self.workflow_type.clone(),
            });
        }

        for (position, t) in self.transitions.iter().enumerate() {
            let expected = (position + 1) as i64;
            if t.order != expected {
                return Err(ChainError::NonContiguousOrder {
                    workflow_type: self.workflow_type.clone(),
                    position,
                    expected,
                    found: t.order,
                });
            }
        }

        for pair in self.transitions.windows(2) {
            if pair[0].next_stage != pair[1].current_stage {
                return Err(ChainError::BrokenLink {
                    workflow_type: self.workflow_type.clone(),
                    current_stage: pair[0].current_stage.clone(),
                    next_stage: pair[0].next_stage.clone(),
                    expected_order: pair[1].order,
                });
            }
        }

        // The last row closes the chain; its next_stage has no row.
        let last = &self.transitions[self.transitions.len() - 1];
        if self
            .transitions
            .iter()
            .any(|t| t.current_stage == last.next_stage)
        {
            return Err(ChainError::CyclicTerminal {
                workflow_type: self.workflow_type.clone(),
                next_stage: last.next_stage.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(current: &str, next: &str, order: i64) -> StageTransitionRecord {
        StageTransitionRecord {
            workflow_type: MEMBER_ONBOARDING.to_string(),
            current_stage: current.to_string(),
            next_stage: next.to_string(),
            order,
            approval_stage: String::new(),
            is_active: true,
            description: String::new(),
        }
    }

    fn chain(transitions: Vec<StageTransitionRecord>) -> StageChain {
        StageChain {
            workflow_type: MEMBER_ONBOARDING.to_string(),
            transitions,
        }
    }

    #[test]
    fn valid_three_stage_chain() {
        let c = chain(vec![
            transition("committee", "board", 1),
            transition("board", "ceo", 2),
            transition("ceo", "approved", 3),
        ]);
        c.validate().unwrap();
        assert_eq!(c.stage_names(), vec!["committee", "board", "ceo"]);
        assert_eq!(c.order_of("ceo"), Some(3));
        assert_eq!(c.order_of("approved"), None);
    }

    #[test]
    fn empty_chain_is_rejected() {
        let err = chain(vec![]).validate().unwrap_err();
        assert!(matches!(err, ChainError::Empty { .. }));
    }

    #[test]
    fn gap_in_order_is_rejected() {
        let err = chain(vec![
            transition("committee", "ceo", 1),
            transition("ceo", "approved", 3),
        ])
        .validate()
        .unwrap_err();
        match err {
            ChainError::NonContiguousOrder {
                position,
                expected,
                found,
                ..
            } => {
                assert_eq!(position, 1);
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("expected NonContiguousOrder, got: {other}"),
        }
    }

    #[test]
    fn broken_link_is_rejected() {
        let err = chain(vec![
            transition("committee", "board", 1),
            transition("ceo", "approved", 2),
        ])
        .validate()
        .unwrap_err();
        assert!(matches!(err, ChainError::BrokenLink { .. }));
    }

    #[test]
    fn cyclic_terminal_is_rejected() {
        let err = chain(vec![
            transition("committee", "ceo", 1),
            transition("ceo", "committee", 2),
        ])
        .validate()
        .unwrap_err();
        assert!(matches!(err, ChainError::CyclicTerminal { .. }));
    }
}

//! In-memory MembershipStore backend.
//!
//! The reference implementation: a `Vec`-per-collection store behind an
//! `Arc<Mutex<_>>`. Used by the engine's tests and as the baseline the
//! conformance suite is developed against. Clones share the same
//! underlying collections.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{
    ApplicationRecord, ExecutionRecord, IndexSpec, StageHistoryEntry, StageTransitionRecord,
};
use crate::traits::MembershipStore;

#[derive(Default)]
struct Inner {
    executions: Vec<ExecutionRecord>,
    transitions: Vec<StageTransitionRecord>,
    applications: Vec<ApplicationRecord>,
    indexes: Vec<IndexSpec>,
    history_writes: usize,
}

/// Shared in-memory store. Cheap to clone; clones alias the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `update_application_history` calls that reached the
    /// store. Lets tests assert no-op write avoidance.
    pub fn history_write_count(&self) -> usize {
        self.inner.lock().unwrap().history_writes
    }

    /// Number of indexes currently maintained.
    pub fn index_count(&self) -> usize {
        self.inner.lock().unwrap().indexes.len()
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn find_execution(&self, name: &str) -> Result<Option<ExecutionRecord>, StorageError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.executions.iter().find(|r| r.name == name).cloned())
    }

    async fn upsert_execution(&self, record: ExecutionRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.executions.iter_mut().find(|r| r.name == record.name) {
            Some(existing) => *existing = record,
            None => inner.executions.push(record),
        }
        Ok(())
    }

    async fn list_executions(&self) -> Result<Vec<ExecutionRecord>, StorageError> {
        Ok(self.inner.lock().unwrap().executions.clone())
    }

    async fn find_transition(
        &self,
        workflow_type: &str,
        current_stage: &str,
    ) -> Result<Option<StageTransitionRecord>, StorageError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .transitions
            .iter()
            .find(|t| t.workflow_type == workflow_type && t.current_stage == current_stage)
            .cloned())
    }

    async fn upsert_transition(&self, record: StageTransitionRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.transitions.iter_mut().find(|t| {
            t.workflow_type == record.workflow_type && t.current_stage == record.current_stage
        }) {
            Some(existing) => *existing = record,
            None => inner.transitions.push(record),
        }
        Ok(())
    }

    async fn delete_transition(
        &self,
        workflow_type: &str,
        current_stage: &str,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.transitions.len();
        inner
            .transitions
            .retain(|t| !(t.workflow_type == workflow_type && t.current_stage == current_stage));
        if inner.transitions.len() == before {
            return Err(StorageError::TransitionNotFound {
                workflow_type: workflow_type.to_string(),
                current_stage: current_stage.to_string(),
            });
        }
        Ok(())
    }

    async fn list_transitions(
        &self,
        workflow_type: &str,
    ) -> Result<Vec<StageTransitionRecord>, StorageError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<StageTransitionRecord> = inner
            .transitions
            .iter()
            .filter(|t| t.workflow_type == workflow_type)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.order);
        Ok(rows)
    }

    async fn scan_applications(
        &self,
        workflow_type: &str,
    ) -> Result<Vec<ApplicationRecord>, StorageError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .applications
            .iter()
            .filter(|a| a.workflow_type == workflow_type)
            .cloned()
            .collect())
    }

    async fn upsert_application(&self, record: ApplicationRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.applications.iter_mut().find(|a| a.id == record.id) {
            Some(existing) => *existing = record,
            None => inner.applications.push(record),
        }
        Ok(())
    }

    async fn update_application_history(
        &self,
        id: &str,
        history: Vec<StageHistoryEntry>,
        updated_at: &str,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        inner.history_writes += 1;
        let app = inner
            .applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StorageError::ApplicationNotFound { id: id.to_string() })?;
        app.stage_history = history;
        app.updated_at = updated_at.to_string();
        Ok(())
    }

    async fn ensure_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        let exists = inner
            .indexes
            .iter()
            .any(|i| i.collection == collection && i.field == field);
        if !exists {
            inner.indexes.push(IndexSpec {
                collection: collection.to_string(),
                field: field.to_string(),
                unique,
            });
        }
        Ok(())
    }
}

//! JSON-file-backed MembershipStore.
//!
//! The whole store is one JSON document on disk, rewritten after every
//! mutation. Read-modify-write with no locking beyond an in-process
//! mutex; the engine's single-writer assumption holds for an operator
//! CLI.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use quorum_storage::{
    ApplicationRecord, ExecutionRecord, IndexSpec, MembershipStore, StageHistoryEntry,
    StageTransitionRecord, StorageError,
};

#[derive(Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    executions: Vec<ExecutionRecord>,
    #[serde(default)]
    transitions: Vec<StageTransitionRecord>,
    #[serde(default)]
    applications: Vec<ApplicationRecord>,
    #[serde(default)]
    indexes: Vec<IndexSpec>,
}

pub(crate) struct JsonFileStore {
    path: PathBuf,
    doc: Mutex<StoreDocument>,
}

impl JsonFileStore {
    /// Open a store document, starting empty if the file does not exist
    /// yet. The file is only created on the first mutation.
    pub(crate) fn open(path: &Path) -> Result<Self, StorageError> {
        let doc = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| StorageError::Backend(format!("read {}: {e}", path.display())))?;
            serde_json::from_str(&raw)
                .map_err(|e| StorageError::Backend(format!("parse {}: {e}", path.display())))?
        } else {
            StoreDocument::default()
        };
        Ok(Self {
            path: path.to_path_buf(),
            doc: Mutex::new(doc),
        })
    }

    fn save(&self, doc: &StoreDocument) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(doc)
            .map_err(|e| StorageError::Backend(format!("serialize store: {e}")))?;
        std::fs::write(&self.path, raw)
            .map_err(|e| StorageError::Backend(format!("write {}: {e}", self.path.display())))
    }
}

#[async_trait]
impl MembershipStore for JsonFileStore {
    async fn find_execution(&self, name: &str) -> Result<Option<ExecutionRecord>, StorageError> {
        let doc = self.doc.lock().unwrap();
        Ok(doc.executions.iter().find(|r| r.name == name).cloned())
    }

    async fn upsert_execution(&self, record: ExecutionRecord) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().unwrap();
        match doc.executions.iter_mut().find(|r| r.name == record.name) {
            Some(existing) => *existing = record,
            None => doc.executions.push(record),
        }
        self.save(&doc)
    }

    async fn list_executions(&self) -> Result<Vec<ExecutionRecord>, StorageError> {
        Ok(self.doc.lock().unwrap().executions.clone())
    }

    async fn find_transition(
        &self,
        workflow_type: &str,
        current_stage: &str,
    ) -> Result<Option<StageTransitionRecord>, StorageError> {
        let doc = self.doc.lock().unwrap();
        Ok(doc
            .transitions
            .iter()
            .find(|t| t.workflow_type == workflow_type && t.current_stage == current_stage)
            .cloned())
    }

    async fn upsert_transition(&self, record: StageTransitionRecord) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().unwrap();
        match doc.transitions.iter_mut().find(|t| {
            t.workflow_type == record.workflow_type && t.current_stage == record.current_stage
        }) {
            Some(existing) => *existing = record,
            None => doc.transitions.push(record),
        }
        self.save(&doc)
    }

    async fn delete_transition(
        &self,
        workflow_type: &str,
        current_stage: &str,
    ) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().unwrap();
        let before = doc.transitions.len();
        doc.transitions
            .retain(|t| !(t.workflow_type == workflow_type && t.current_stage == current_stage));
        if doc.transitions.len() == before {
            return Err(StorageError::TransitionNotFound {
                workflow_type: workflow_type.to_string(),
                current_stage: current_stage.to_string(),
            });
        }
        self.save(&doc)
    }

    async fn list_transitions(
        &self,
        workflow_type: &str,
    ) -> Result<Vec<StageTransitionRecord>, StorageError> {
        let doc = self.doc.lock().unwrap();
        let mut rows: Vec<StageTransitionRecord> = doc
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
        let doc = self.doc.lock().unwrap();
        Ok(doc
            .applications
            .iter()
            .filter(|a| a.workflow_type == workflow_type)
            .cloned()
            .collect())
    }

    async fn upsert_application(&self, record: ApplicationRecord) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().unwrap();
        match doc.applications.iter_mut().find(|a| a.id == record.id) {
            Some(existing) => *existing = record,
            None => doc.applications.push(record),
        }
        self.save(&doc)
    }

    async fn update_application_history(
        &self,
        id: &str,
        history: Vec<StageHistoryEntry>,
        updated_at: &str,
    ) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().unwrap();
        let app = doc
            .applications
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StorageError::ApplicationNotFound { id: id.to_string() })?;
        app.stage_history = history;
        app.updated_at = updated_at.to_string();
        self.save(&doc)
    }

    async fn ensure_index(
        &self,
        collection: &str,
        field: &str,
        unique: bool,
    ) -> Result<(), StorageError> {
        let mut doc = self.doc.lock().unwrap();
        let exists = doc
            .indexes
            .iter()
            .any(|i| i.collection == collection && i.field == field);
        if !exists {
            doc.indexes.push(IndexSpec {
                collection: collection.to_string(),
                field: field.to_string(),
                unique,
            });
            self.save(&doc)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use quorum_storage::conformance::run_conformance_suite;
    use quorum_storage::ExecutionStatus;

    use super::*;

    #[tokio::test]
    async fn json_file_store_conformance() {
        let dir = tempfile::tempdir().unwrap();
        let counter = AtomicUsize::new(0);
        let report = run_conformance_suite(|| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let path = dir.path().join(format!("store-{n}.json"));
            async move { JsonFileStore::open(&path).unwrap() }
        })
        .await;
        assert!(report.failed == 0, "{report}");
    }

    #[tokio::test]
    async fn reopen_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = JsonFileStore::open(&path).unwrap();
        store
            .upsert_execution(ExecutionRecord {
                name: "001-create-indexes".to_string(),
                executed_at: "2026-01-01T00:00:00.000Z".to_string(),
                execution_time_ms: 5,
                status: ExecutionStatus::Completed,
                error: None,
            })
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        let found = reopened
            .find_execution("001-create-indexes")
            .await
            .unwrap()
            .expect("record lost across reopen");
        assert_eq!(found.status, ExecutionStatus::Completed);
    }

    #[tokio::test]
    async fn open_missing_file_starts_empty_without_creating_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.list_executions().await.unwrap().is_empty());
        assert!(!path.exists());
    }
}

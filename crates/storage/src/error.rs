/// All errors that can be returned by a MembershipStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No stage transition with the given (workflow_type, current_stage) key.
    #[error("stage transition not found: {workflow_type}/{current_stage}")]
    TransitionNotFound {
        workflow_type: String,
        current_stage: String,
    },

    /// No application with the given id.
    #[error("application not found: {id}")]
    ApplicationNotFound { id: String },

    /// A backend-specific storage error (file I/O, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}

use wellops_core::CoreError;
use wellops_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("proposal not found: {0}")]
    ProposalNotFound(String),

    #[error("Target well not found: {0}")]
    WellNotFound(String),

    #[error("{user} may not {action}")]
    Forbidden { user: String, action: &'static str },

    #[error("approval of {change_id} failed: {message}")]
    ApprovalFailed { change_id: String, message: String },

    #[error("config error: {0}")]
    Config(String),
}

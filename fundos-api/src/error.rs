use thiserror::Error;

/// Errors surfaced by the workflow core.
///
/// Every rejected transition maps to exactly one variant so the UI can show
/// a specific message: `IllegalTransition` means the move is not permitted
/// for the acting role from the current status, while `ValidationError`
/// covers malformed input, including a missing mandatory reason.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transition to '{to}' is not allowed for role {role} from status '{from}'")]
    IllegalTransition {
        role: String,
        from: String,
        to: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl WorkflowError {
    /// Wrap a repository-layer failure.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        WorkflowError::InternalError(err.to_string())
    }
}

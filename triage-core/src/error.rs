use crate::model::Status;

/// Caller-facing failures of the lifecycle engine.
///
/// The first four variants describe a malformed request and are never retried.
/// Store failures propagate unchanged.
#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("{0}")]
    Validation(String),
    #[error("incident not found: {0}")]
    NotFound(String),
    #[error("invalid status transition: {from} -> {to} (allowed: {})", allowed_list(.allowed))]
    Transition {
        from: Status,
        to: Status,
        allowed: Vec<Status>,
    },
    #[error("{0}")]
    Precondition(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TriageError {
    /// Stable machine-readable code for boundary layers.
    pub fn code(&self) -> &'static str {
        match self {
            TriageError::Validation(_) => "validation_error",
            TriageError::NotFound(_) => "not_found",
            TriageError::Transition { .. } => "transition_error",
            TriageError::Precondition(_) => "precondition_error",
            TriageError::Store(StoreError::Conflict { .. }) => "conflict",
            TriageError::Store(_) => "store_error",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("incident {id} was modified concurrently")]
    Conflict { id: String },
    #[error("store lock poisoned: {0}")]
    Lock(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn allowed_list(allowed: &[Status]) -> String {
    if allowed.is_empty() {
        return "none".into();
    }
    allowed
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

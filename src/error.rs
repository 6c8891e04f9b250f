//! Error types for project persistence.

use thiserror::Error;

/// Main error type for project save/load operations.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Attribute store is locked by another process")]
    Locked,

    #[error("Unknown state variant: {0}")]
    UnknownVariant(String),

    #[error("No serializer registered for state type: {0}")]
    UnsupportedVariant(String),

    #[error("Variant already registered: {0}")]
    VariantExists(String),

    #[error("Dangling reference to state index {0}")]
    DanglingReference(usize),

    #[error("Malformed document at {path}: {reason}")]
    MalformedDocument { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Dependency of state {0:?} is not in the store")]
    MissingDependency(String),

    #[error("State already in the store: {0:?}")]
    DuplicateState(String),

    #[error("State {index} is referenced by state {dependent}")]
    StateInUse { index: usize, dependent: usize },

    #[error("State index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("A project operation is already in flight")]
    Busy,

    #[error("Project worker has stopped")]
    WorkerStopped,
}

impl ProjectError {
    /// Shorthand for a [`ProjectError::MalformedDocument`].
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ProjectError::MalformedDocument {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ProjectError {
    fn from(e: serde_json::Error) -> Self {
        ProjectError::Serialization(e.to_string())
    }
}

/// Result type for project operations.
pub type Result<T> = std::result::Result<T, ProjectError>;

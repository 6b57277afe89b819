//! Error types for Warden core operations.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while managing playbooks, inventories, and namespaces.
///
/// The variants form the error taxonomy shared by every collaborator:
/// storage repositories report `Storage`, cluster repositories report
/// `Cluster`, and the services in this crate produce the rest. Only
/// `AlreadyExists` is ever recovered from (during orchestrated create);
/// everything else propagates to the caller unchanged.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("no template files found in the playbook")]
    NoTemplatesFound,

    #[error("template `{name}`: {message}")]
    Template { name: String, message: String },

    #[error("defaults file unreadable: {0}")]
    DefaultsUnreadable(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("cluster error: {0}")]
    Cluster(String),
}

impl CoreError {
    /// Shorthand for the empty-namespace validation failure used by every
    /// namespace-keyed operation.
    pub fn empty_namespace() -> Self {
        CoreError::Validation("namespace cannot be empty".to_string())
    }
}

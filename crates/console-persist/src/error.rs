use thiserror::Error;

use crate::models::Message;

/// Coarse failure classes callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing request fields. Never retried.
    InvalidInput,
    /// A referenced entity does not exist
    NotFound,
    /// Uniqueness violation
    Conflict,
    /// Store unreachable or a multi-step write only partly applied
    StorageFailure,
}

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The message insert succeeded but the thread's recency marker was not advanced
    #[error("Message {} was stored but thread {} was not updated: {reason}", .message.id, .message.thread_id)]
    PartialWrite { message: Box<Message>, reason: String },

    #[cfg(feature = "mongodb")]
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON serialization error: {0}")]
    BsonSerialization(#[from] bson::ser::Error),

    #[cfg(feature = "mongodb")]
    #[error("BSON deserialization error: {0}")]
    BsonDeserialization(#[from] bson::de::Error),

    /// A reconcile sweep ran to the end but some threads could not be repaired
    #[error("Reconcile sweep incomplete: {failed} threads failed, {repaired} repaired")]
    ReconcileIncomplete { repaired: usize, failed: usize },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PersistError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PersistError::InvalidInput(_) => ErrorKind::InvalidInput,
            PersistError::NotFound { .. } => ErrorKind::NotFound,
            PersistError::Conflict(_) => ErrorKind::Conflict,
            _ => ErrorKind::StorageFailure,
        }
    }

    pub(crate) fn project_not_found(id: impl Into<String>) -> Self {
        PersistError::NotFound { entity: "Project", id: id.into() }
    }

    pub(crate) fn thread_not_found(id: impl Into<String>) -> Self {
        PersistError::NotFound { entity: "Thread", id: id.into() }
    }

    pub(crate) fn duplicate_slug(slug: &str) -> Self {
        PersistError::Conflict(format!("A project with slug '{}' already exists", slug))
    }
}

pub type Result<T> = std::result::Result<T, PersistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(PersistError::InvalidInput("x".into()).kind(), ErrorKind::InvalidInput);
        assert_eq!(PersistError::thread_not_found("t").kind(), ErrorKind::NotFound);
        assert_eq!(PersistError::duplicate_slug("s").kind(), ErrorKind::Conflict);
        assert_eq!(PersistError::Connection("down".into()).kind(), ErrorKind::StorageFailure);
    }

    #[test]
    fn test_not_found_message() {
        let err = PersistError::project_not_found("abc");
        assert_eq!(err.to_string(), "Project not found: abc");
    }
}

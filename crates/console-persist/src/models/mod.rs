mod message;
mod project;
mod thread;

use chrono::{DateTime, SubsecRound, Utc};

pub use message::{Message, MessageRole, NewMessage};
pub use project::{NewProject, Project, ProjectPatch};
pub use thread::{external_ref_for, NewThread, Thread, ThreadPatch, DEFAULT_THREAD_TITLE};

/// Current time truncated to the millisecond, the precision every backend stores.
pub(crate) fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Trim a required field, rejecting blank values
pub(crate) fn required(field: &str, value: String) -> crate::error::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::error::PersistError::InvalidInput(format!(
            "Missing required field: {}",
            field
        )));
    }
    Ok(trimmed.to_string())
}

/// Blank optional strings are stored as null
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, non_blank, now_millis, required};
use crate::error::{PersistError, Result};

/// One chat turn. Messages are append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    pub content: String,
    /// Generation profile, only kept for assistant messages
    pub model_profile: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            "system" => Ok(MessageRole::System),
            other => Err(PersistError::InvalidInput(format!(
                "Invalid role '{}'. Must be one of: user, assistant, system",
                other
            ))),
        }
    }
}

/// Request to append a message to a thread.
///
/// `role` is kept as the raw string the caller sent so that an unknown
/// role is reported as invalid input rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewMessage {
    pub thread_id: String,
    pub role: String,
    pub content: String,
    pub model_profile: Option<String>,
}

impl NewMessage {
    pub fn new(
        thread_id: impl Into<String>,
        role: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            role: role.into(),
            content: content.into(),
            model_profile: None,
        }
    }

    pub fn with_model_profile(mut self, profile: impl Into<String>) -> Self {
        self.model_profile = Some(profile.into());
        self
    }

    /// Validate and turn into a record ready for storage.
    ///
    /// `created_at` is a provisional server timestamp; the store may move it
    /// forward to keep per-thread ordering monotonic.
    pub(crate) fn into_message(self) -> Result<Message> {
        let thread_id = required("threadId", self.thread_id)?;
        let role: MessageRole = self.role.trim().parse()?;
        if self.content.trim().is_empty() {
            return Err(PersistError::InvalidInput(
                "Missing required field: content".to_string(),
            ));
        }
        let model_profile = match role {
            MessageRole::Assistant => non_blank(self.model_profile),
            MessageRole::User | MessageRole::System => None,
        };

        Ok(Message {
            id: new_id(),
            thread_id,
            role,
            content: self.content,
            model_profile,
            created_at: now_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("user".parse::<MessageRole>().unwrap(), MessageRole::User);
        assert_eq!("assistant".parse::<MessageRole>().unwrap(), MessageRole::Assistant);
        assert_eq!("system".parse::<MessageRole>().unwrap(), MessageRole::System);

        let err = "moderator".parse::<MessageRole>().unwrap_err();
        assert!(matches!(err, PersistError::InvalidInput(_)));
        assert!("User".parse::<MessageRole>().is_err());
    }

    #[test]
    fn test_model_profile_dropped_for_user_messages() {
        let message = NewMessage::new("t1", "user", "Hello")
            .with_model_profile("default-chat")
            .into_message()
            .unwrap();
        assert_eq!(message.model_profile, None);

        let message = NewMessage::new("t1", "assistant", "Hi")
            .with_model_profile("default-chat")
            .into_message()
            .unwrap();
        assert_eq!(message.model_profile.as_deref(), Some("default-chat"));
    }

    #[test]
    fn test_empty_content_rejected() {
        let err = NewMessage::new("t1", "user", "   ").into_message().unwrap_err();
        assert!(matches!(err, PersistError::InvalidInput(_)));
    }

    #[test]
    fn test_content_is_not_trimmed() {
        let message = NewMessage::new("t1", "user", "  spaced  ").into_message().unwrap();
        assert_eq!(message.content, "  spaced  ");
    }
}

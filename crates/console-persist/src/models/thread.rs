use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, non_blank, now_millis, required, Project};
use crate::error::{PersistError, Result};

pub const DEFAULT_THREAD_TITLE: &str = "New chat";

/// A conversation session owned by one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub mode_hint: Option<String>,
    /// `{project.external_system_ref}:thread:{id}`, fixed at creation
    pub external_ref: String,
    pub is_archived: bool,
    pub is_pinned: bool,
    /// `created_at` of the newest message, null until the first one arrives
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reference used to address a thread in the external memory service
pub fn external_ref_for(project: &Project, thread_id: &str) -> String {
    format!("{}:thread:{}", project.external_system_ref, thread_id)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewThread {
    pub project_id: String,
    pub title: Option<String>,
    pub mode_hint: Option<String>,
}

impl NewThread {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn mode_hint(mut self, mode_hint: impl Into<String>) -> Self {
        self.mode_hint = Some(mode_hint.into());
        self
    }

    pub(crate) fn into_thread(self, project: &Project) -> Thread {
        let id = new_id();
        let now = now_millis();

        Thread {
            external_ref: external_ref_for(project, &id),
            id,
            project_id: project.id.clone(),
            title: non_blank(self.title).unwrap_or_else(|| DEFAULT_THREAD_TITLE.to_string()),
            mode_hint: non_blank(self.mode_hint),
            is_archived: false,
            is_pinned: false,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User-editable thread fields. The external reference and the recency
/// marker are never written through a patch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadPatch {
    #[serde(default)]
    pub title: Option<String>,
    /// Empty string clears the hint
    #[serde(default)]
    pub mode_hint: Option<String>,
    #[serde(default)]
    pub is_archived: Option<bool>,
    #[serde(default)]
    pub is_pinned: Option<bool>,
}

impl ThreadPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.mode_hint.is_none()
            && self.is_archived.is_none()
            && self.is_pinned.is_none()
    }

    pub(crate) fn apply(self, thread: &mut Thread) -> Result<()> {
        if self.is_empty() {
            return Err(PersistError::InvalidInput("No fields to update".to_string()));
        }
        if let Some(title) = self.title {
            thread.title = required("title", title)?;
        }
        if let Some(mode_hint) = self.mode_hint {
            thread.mode_hint = non_blank(Some(mode_hint));
        }
        if let Some(is_archived) = self.is_archived {
            thread.is_archived = is_archived;
        }
        if let Some(is_pinned) = self.is_pinned {
            thread.is_pinned = is_pinned;
        }
        thread.updated_at = now_millis().max(thread.updated_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewProject;

    fn project() -> Project {
        NewProject::new("AI Console", "ai-console", "ai-console")
            .into_project()
            .unwrap()
    }

    #[test]
    fn test_external_ref_derivation() {
        let project = project();
        let thread = NewThread::new(&project.id).title("Getting Started").into_thread(&project);

        assert_eq!(thread.external_ref, format!("ai-console:thread:{}", thread.id));
        assert_eq!(thread.project_id, project.id);
        assert_eq!(thread.last_message_at, None);
    }

    #[test]
    fn test_default_title() {
        let project = project();
        assert_eq!(NewThread::new(&project.id).into_thread(&project).title, DEFAULT_THREAD_TITLE);
        assert_eq!(
            NewThread::new(&project.id).title(" ").into_thread(&project).title,
            DEFAULT_THREAD_TITLE
        );
    }

    #[test]
    fn test_patch_keeps_external_ref() {
        let project = project();
        let mut thread = NewThread::new(&project.id).mode_hint("chat").into_thread(&project);
        let external_ref = thread.external_ref.clone();

        ThreadPatch {
            title: Some("Renamed".to_string()),
            mode_hint: Some(String::new()),
            is_pinned: Some(true),
            ..Default::default()
        }
        .apply(&mut thread)
        .unwrap();

        assert_eq!(thread.title, "Renamed");
        assert_eq!(thread.mode_hint, None);
        assert!(thread.is_pinned);
        assert!(!thread.is_archived);
        assert_eq!(thread.external_ref, external_ref);
    }
}

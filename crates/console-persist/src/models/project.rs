use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{new_id, non_blank, now_millis, required};
use crate::error::{PersistError, Result};

/// A named workspace grouping threads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    /// Globally unique, human-stable external key
    pub slug: String,
    /// Identifies this project to the external memory service
    pub external_system_ref: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewProject {
    pub name: String,
    pub slug: String,
    pub external_system_ref: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

impl NewProject {
    pub fn new(
        name: impl Into<String>,
        slug: impl Into<String>,
        external_system_ref: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            external_system_ref: external_system_ref.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub(crate) fn into_project(self) -> Result<Project> {
        let name = required("name", self.name)?;
        let slug = required("slug", self.slug)?;
        let external_system_ref = required("externalSystemRef", self.external_system_ref)?;
        let now = now_millis();

        Ok(Project {
            id: new_id(),
            name,
            slug,
            external_system_ref,
            description: non_blank(self.description),
            icon: non_blank(self.icon),
            color: non_blank(self.color),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Display metadata changes. Slug and external reference are immutable.
///
/// For the optional fields an empty string clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.icon.is_none()
            && self.color.is_none()
    }

    pub(crate) fn apply(self, project: &mut Project) -> Result<()> {
        if self.is_empty() {
            return Err(PersistError::InvalidInput("No fields to update".to_string()));
        }
        if let Some(name) = self.name {
            project.name = required("name", name)?;
        }
        if let Some(description) = self.description {
            project.description = non_blank(Some(description));
        }
        if let Some(icon) = self.icon {
            project.icon = non_blank(Some(icon));
        }
        if let Some(color) = self.color {
            project.color = non_blank(Some(color));
        }
        project.updated_at = now_millis().max(project.updated_at);
        Ok(())
    }
}

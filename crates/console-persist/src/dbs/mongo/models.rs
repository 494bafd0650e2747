use bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

use crate::models::{Message, MessageRole, Project, Thread};

// Timestamps are stored as BSON datetimes (millisecond precision) so that
// range queries and sorts compare instants, not strings.

/// MongoDB document for `projects`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoProject {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub slug: String,
    pub external_system_ref: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

/// MongoDB document for `threads`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoThread {
    #[serde(rename = "_id")]
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub mode_hint: Option<String>,
    pub external_ref: String,
    pub is_archived: bool,
    pub is_pinned: bool,
    /// Stored as an explicit null so descending sorts place it last
    pub last_message_at: Option<BsonDateTime>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

/// MongoDB document for `messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub thread_id: String,
    pub role: MessageRole,
    pub content: String,
    pub model_profile: Option<String>,
    pub created_at: BsonDateTime,
}

impl From<Project> for MongoProject {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
            slug: project.slug,
            external_system_ref: project.external_system_ref,
            description: project.description,
            icon: project.icon,
            color: project.color,
            created_at: BsonDateTime::from_chrono(project.created_at),
            updated_at: BsonDateTime::from_chrono(project.updated_at),
        }
    }
}

impl From<MongoProject> for Project {
    fn from(project: MongoProject) -> Self {
        Self {
            id: project.id,
            name: project.name,
            slug: project.slug,
            external_system_ref: project.external_system_ref,
            description: project.description,
            icon: project.icon,
            color: project.color,
            created_at: project.created_at.to_chrono(),
            updated_at: project.updated_at.to_chrono(),
        }
    }
}

impl From<Thread> for MongoThread {
    fn from(thread: Thread) -> Self {
        Self {
            id: thread.id,
            project_id: thread.project_id,
            title: thread.title,
            mode_hint: thread.mode_hint,
            external_ref: thread.external_ref,
            is_archived: thread.is_archived,
            is_pinned: thread.is_pinned,
            last_message_at: thread.last_message_at.map(BsonDateTime::from_chrono),
            created_at: BsonDateTime::from_chrono(thread.created_at),
            updated_at: BsonDateTime::from_chrono(thread.updated_at),
        }
    }
}

impl From<MongoThread> for Thread {
    fn from(thread: MongoThread) -> Self {
        Self {
            id: thread.id,
            project_id: thread.project_id,
            title: thread.title,
            mode_hint: thread.mode_hint,
            external_ref: thread.external_ref,
            is_archived: thread.is_archived,
            is_pinned: thread.is_pinned,
            last_message_at: thread.last_message_at.map(|at| at.to_chrono()),
            created_at: thread.created_at.to_chrono(),
            updated_at: thread.updated_at.to_chrono(),
        }
    }
}

impl From<Message> for MongoMessage {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            thread_id: message.thread_id,
            role: message.role,
            content: message.content,
            model_profile: message.model_profile,
            created_at: BsonDateTime::from_chrono(message.created_at),
        }
    }
}

impl From<MongoMessage> for Message {
    fn from(message: MongoMessage) -> Self {
        Self {
            id: message.id,
            thread_id: message.thread_id,
            role: message.role,
            content: message.content,
            model_profile: message.model_profile,
            created_at: message.created_at.to_chrono(),
        }
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{PersistError, Result};
use crate::models::{Message, Project, Thread};
use crate::ordering::{message_order, project_order, thread_order};
use crate::trait_client::PersistenceClient;

#[derive(Default)]
struct Tables {
    projects: HashMap<String, Project>,
    threads: HashMap<String, Thread>,
    /// Keyed by thread id
    messages: HashMap<String, Vec<Message>>,
}

/// Process-local store. Every write takes the single table lock, so each
/// operation is atomic and writers are serialized.
#[derive(Default)]
pub struct MemoryPersistenceClient {
    tables: RwLock<Tables>,
}

impl MemoryPersistenceClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceClient for MemoryPersistenceClient {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_project(&self, project: Project) -> Result<Project> {
        let mut tables = self.tables.write().await;
        if tables.projects.values().any(|p| p.slug == project.slug) {
            return Err(PersistError::duplicate_slug(&project.slug));
        }
        tables.projects.insert(project.id.clone(), project.clone());
        Ok(project)
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        Ok(self.tables.read().await.projects.get(project_id).cloned())
    }

    async fn get_project_by_slug(&self, slug: &str) -> Result<Option<Project>> {
        let tables = self.tables.read().await;
        Ok(tables.projects.values().find(|p| p.slug == slug).cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> =
            self.tables.read().await.projects.values().cloned().collect();
        projects.sort_by(project_order);
        Ok(projects)
    }

    async fn update_project(&self, project: Project) -> Result<Project> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .projects
            .get_mut(&project.id)
            .ok_or_else(|| PersistError::project_not_found(&project.id))?;

        stored.name = project.name;
        stored.description = project.description;
        stored.icon = project.icon;
        stored.color = project.color;
        stored.updated_at = project.updated_at;
        Ok(stored.clone())
    }

    async fn delete_project(&self, project_id: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.projects.remove(project_id).is_none() {
            return Ok(false);
        }

        let thread_ids: Vec<String> = tables
            .threads
            .values()
            .filter(|t| t.project_id == project_id)
            .map(|t| t.id.clone())
            .collect();
        for thread_id in &thread_ids {
            tables.messages.remove(thread_id);
            tables.threads.remove(thread_id);
        }
        Ok(true)
    }

    async fn insert_thread(&self, thread: Thread) -> Result<Thread> {
        let mut tables = self.tables.write().await;
        if !tables.projects.contains_key(&thread.project_id) {
            return Err(PersistError::project_not_found(&thread.project_id));
        }
        tables.threads.insert(thread.id.clone(), thread.clone());
        Ok(thread)
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        Ok(self.tables.read().await.threads.get(thread_id).cloned())
    }

    async fn find_thread_by_external_ref(&self, external_ref: &str) -> Result<Option<Thread>> {
        let tables = self.tables.read().await;
        Ok(tables
            .threads
            .values()
            .find(|t| t.external_ref == external_ref)
            .cloned())
    }

    async fn list_threads(&self, project_id: &str) -> Result<Vec<Thread>> {
        let mut threads: Vec<Thread> = self
            .tables
            .read()
            .await
            .threads
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect();
        threads.sort_by(thread_order);
        Ok(threads)
    }

    async fn list_thread_ids(&self) -> Result<Vec<String>> {
        Ok(self.tables.read().await.threads.keys().cloned().collect())
    }

    async fn update_thread(&self, thread: Thread) -> Result<Thread> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .threads
            .get_mut(&thread.id)
            .ok_or_else(|| PersistError::thread_not_found(&thread.id))?;

        stored.title = thread.title;
        stored.mode_hint = thread.mode_hint;
        stored.is_archived = thread.is_archived;
        stored.is_pinned = thread.is_pinned;
        stored.updated_at = stored.updated_at.max(thread.updated_at);
        Ok(stored.clone())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.threads.remove(thread_id).is_none() {
            return Ok(false);
        }
        tables.messages.remove(thread_id);
        Ok(true)
    }

    async fn append_message(&self, mut message: Message) -> Result<Message> {
        let mut tables = self.tables.write().await;
        let thread = tables
            .threads
            .get_mut(&message.thread_id)
            .ok_or_else(|| PersistError::thread_not_found(&message.thread_id))?;

        // Never earlier than the current marker or the last thread edit, so
        // both thread fields can take the message timestamp verbatim
        let floor = thread
            .last_message_at
            .map_or(thread.updated_at, |last| last.max(thread.updated_at));
        message.created_at = message.created_at.max(floor);
        thread.last_message_at = Some(message.created_at);
        thread.updated_at = message.created_at;

        tables
            .messages
            .entry(message.thread_id.clone())
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        let mut messages = self
            .tables
            .read()
            .await
            .messages
            .get(thread_id)
            .cloned()
            .unwrap_or_default();
        messages.sort_by(message_order);
        Ok(messages)
    }

    async fn latest_message_at(&self, thread_id: &str) -> Result<Option<DateTime<Utc>>> {
        let tables = self.tables.read().await;
        Ok(tables
            .messages
            .get(thread_id)
            .and_then(|messages| messages.iter().map(|m| m.created_at).max()))
    }

    async fn sync_last_message_at(
        &self,
        thread_id: &str,
        expected: Option<DateTime<Utc>>,
        last_message_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let thread = tables
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| PersistError::thread_not_found(thread_id))?;

        if thread.last_message_at != expected {
            return Ok(false);
        }
        thread.last_message_at = last_message_at;
        if let Some(at) = last_message_at {
            thread.updated_at = thread.updated_at.max(at);
        }
        Ok(true)
    }

    async fn purge_orphans(&self, created_before: DateTime<Utc>) -> Result<u64> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let orphan_threads: Vec<String> = tables
            .threads
            .values()
            .filter(|t| t.created_at < created_before)
            .filter(|t| !tables.projects.contains_key(&t.project_id))
            .map(|t| t.id.clone())
            .collect();
        let mut removed = orphan_threads.len() as u64;
        for thread_id in &orphan_threads {
            tables.threads.remove(thread_id);
        }

        let threads = &tables.threads;
        for (thread_id, messages) in tables.messages.iter_mut() {
            if threads.contains_key(thread_id) {
                continue;
            }
            let before = messages.len();
            messages.retain(|m| m.created_at >= created_before);
            removed += (before - messages.len()) as u64;
        }
        tables.messages.retain(|_, messages| !messages.is_empty());
        Ok(removed)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Message, Project, Thread};

/// Storage primitives for projects, threads and messages.
///
/// Implementations enforce storage-level constraints only: unique slugs,
/// thread→project and message→thread references, cascading deletes.
/// Validation and identifier generation happen in [`crate::ConsoleClient`].
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Cheap round trip used by health checks
    async fn ping(&self) -> Result<()>;

    /// Insert a project. Fails with `Conflict` if the slug is taken.
    async fn insert_project(&self, project: Project) -> Result<Project>;

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>>;

    async fn get_project_by_slug(&self, slug: &str) -> Result<Option<Project>>;

    /// All projects by name (byte order), then id
    async fn list_projects(&self) -> Result<Vec<Project>>;

    /// Overwrite name, display metadata and `updated_at`
    async fn update_project(&self, project: Project) -> Result<Project>;

    /// Delete a project with its threads and their messages as one unit.
    /// Returns `false` if there was no such project.
    async fn delete_project(&self, project_id: &str) -> Result<bool>;

    /// Insert a thread. Fails with `NotFound` if its project is missing.
    async fn insert_thread(&self, thread: Thread) -> Result<Thread>;

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>>;

    async fn find_thread_by_external_ref(&self, external_ref: &str) -> Result<Option<Thread>>;

    /// Threads of a project, most recently active first
    async fn list_threads(&self, project_id: &str) -> Result<Vec<Thread>>;

    /// Ids of every stored thread
    async fn list_thread_ids(&self) -> Result<Vec<String>>;

    /// Overwrite title, mode hint, flags and `updated_at`. Never touches
    /// `external_ref` or `last_message_at`.
    async fn update_thread(&self, thread: Thread) -> Result<Thread>;

    /// Delete a thread and its messages as one unit.
    /// Returns `false` if there was no such thread.
    async fn delete_thread(&self, thread_id: &str) -> Result<bool>;

    /// Insert a message and advance its thread's `last_message_at` and
    /// `updated_at` to the message's `created_at`, as one unit of work.
    ///
    /// The store may move `created_at` forward so that it is never earlier
    /// than the thread's current marker; the persisted message is returned.
    /// Fails with `NotFound` if the thread is missing, and with
    /// `PartialWrite` if the message was stored but the thread was not.
    async fn append_message(&self, message: Message) -> Result<Message>;

    /// Messages of a thread in chronological order
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>>;

    /// Greatest `created_at` among the thread's messages
    async fn latest_message_at(&self, thread_id: &str) -> Result<Option<DateTime<Utc>>>;

    /// Repair primitive for the recency marker: set `last_message_at` to
    /// exactly `last_message_at`, but only if the stored value still equals
    /// `expected`. `Some` also lifts `updated_at` to at least that instant.
    ///
    /// Returns `false` when the stored marker no longer matches `expected`,
    /// `NotFound` when the thread is missing.
    async fn sync_last_message_at(
        &self,
        thread_id: &str,
        expected: Option<DateTime<Utc>>,
        last_message_at: Option<DateTime<Utc>>,
    ) -> Result<bool>;

    /// Remove threads whose project is gone and messages whose thread is
    /// gone, considering only records created before `created_before`.
    /// Returns how many records were removed.
    async fn purge_orphans(&self, created_before: DateTime<Utc>) -> Result<u64>;
}

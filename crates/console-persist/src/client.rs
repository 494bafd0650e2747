use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::dbs::MemoryPersistenceClient;
use crate::error::{PersistError, Result};
use crate::models::{
    Message, NewMessage, NewProject, NewThread, Project, ProjectPatch, Thread, ThreadPatch,
};
use crate::trait_client::PersistenceClient;

pub(crate) const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 50;
const MAX_RECONCILE_ROUNDS: u32 = 3;

/// Entry point for callers: validation, identifier generation, external
/// reference derivation and the recency-marker recovery path live here.
///
/// Holds an explicit store handle; cloning is cheap and shares the store.
#[derive(Clone)]
pub struct ConsoleClient {
    store: Arc<dyn PersistenceClient>,
    retry_attempts: u32,
}

impl ConsoleClient {
    pub fn new(store: Arc<dyn PersistenceClient>) -> Self {
        Self {
            store,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }

    /// Client over a fresh process-local store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPersistenceClient::new()))
    }

    /// How many times the thread update is retried after a partial message write
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn store(&self) -> &Arc<dyn PersistenceClient> {
        &self.store
    }

    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    // Projects

    pub async fn create_project(&self, new_project: NewProject) -> Result<Project> {
        let project = new_project.into_project()?;
        let project = self.store.insert_project(project).await?;
        tracing::info!(project_id = %project.id, slug = %project.slug, "Project created");
        Ok(project)
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Project> {
        self.store
            .get_project(project_id)
            .await?
            .ok_or_else(|| PersistError::project_not_found(project_id))
    }

    pub async fn get_project_by_slug(&self, slug: &str) -> Result<Project> {
        self.store
            .get_project_by_slug(slug)
            .await?
            .ok_or_else(|| PersistError::NotFound {
                entity: "Project",
                id: slug.to_string(),
            })
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        self.store.list_projects().await
    }

    pub async fn update_project(&self, project_id: &str, patch: ProjectPatch) -> Result<Project> {
        let mut project = self.get_project(project_id).await?;
        patch.apply(&mut project)?;
        self.store.update_project(project).await
    }

    /// Delete a project with all of its threads and their messages
    pub async fn delete_project(&self, project_id: &str) -> Result<()> {
        if !self.store.delete_project(project_id).await? {
            return Err(PersistError::project_not_found(project_id));
        }
        tracing::info!(project_id = %project_id, "Project deleted");
        Ok(())
    }

    // Threads

    pub async fn create_thread(&self, new_thread: NewThread) -> Result<Thread> {
        let project = self.get_project(&new_thread.project_id).await?;
        let thread = new_thread.into_thread(&project);
        let thread = self.store.insert_thread(thread).await?;
        tracing::info!(
            thread_id = %thread.id,
            project_id = %thread.project_id,
            external_ref = %thread.external_ref,
            "Thread created"
        );
        Ok(thread)
    }

    pub async fn get_thread(&self, thread_id: &str) -> Result<Thread> {
        self.store
            .get_thread(thread_id)
            .await?
            .ok_or_else(|| PersistError::thread_not_found(thread_id))
    }

    pub async fn find_thread_by_external_ref(&self, external_ref: &str) -> Result<Thread> {
        self.store
            .find_thread_by_external_ref(external_ref)
            .await?
            .ok_or_else(|| PersistError::NotFound {
                entity: "Thread",
                id: external_ref.to_string(),
            })
    }

    /// Threads of a project, most recently active first, empty threads last.
    /// An unknown project yields an empty list.
    pub async fn list_threads(&self, project_id: &str) -> Result<Vec<Thread>> {
        self.store.list_threads(project_id).await
    }

    pub async fn update_thread(&self, thread_id: &str, patch: ThreadPatch) -> Result<Thread> {
        let mut thread = self.get_thread(thread_id).await?;
        patch.apply(&mut thread)?;
        self.store.update_thread(thread).await
    }

    /// Delete a thread and its messages
    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        if !self.store.delete_thread(thread_id).await? {
            return Err(PersistError::thread_not_found(thread_id));
        }
        tracing::info!(thread_id = %thread_id, "Thread deleted");
        Ok(())
    }

    // Messages

    /// Append a message and advance its thread's recency marker.
    ///
    /// Input is validated before storage is touched, so a rejected request
    /// neither inserts a message nor changes the thread.
    pub async fn create_message(&self, new_message: NewMessage) -> Result<Message> {
        let message = new_message.into_message()?;

        match self.store.append_message(message).await {
            Ok(message) => {
                tracing::debug!(
                    message_id = %message.id,
                    thread_id = %message.thread_id,
                    role = %message.role,
                    "Message created"
                );
                Ok(message)
            }
            Err(PersistError::PartialWrite { message, reason }) => {
                tracing::warn!(
                    message_id = %message.id,
                    thread_id = %message.thread_id,
                    "Thread update failed after message insert: {}",
                    reason
                );
                self.recover_partial_write(*message, reason).await
            }
            Err(e) => Err(e),
        }
    }

    async fn recover_partial_write(&self, message: Message, reason: String) -> Result<Message> {
        let mut last_error = reason;
        for attempt in 1..=self.retry_attempts {
            match self.reconcile_thread(&message.thread_id).await {
                // Thread deleted concurrently; the delete took the message with it
                Err(e @ PersistError::NotFound { .. }) => return Err(e),
                Ok(_) => {
                    tracing::info!(
                        thread_id = %message.thread_id,
                        attempt = attempt,
                        "Recency marker recovered"
                    );
                    return Ok(message);
                }
                Err(e) => {
                    tracing::warn!(
                        thread_id = %message.thread_id,
                        attempt = attempt,
                        "Recency marker repair failed: {}",
                        e
                    );
                    last_error = e.to_string();
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64))
                        .await;
                }
            }
        }

        tracing::error!(
            message_id = %message.id,
            thread_id = %message.thread_id,
            "Giving up on recency marker repair; left for the reconciler"
        );
        Err(PersistError::PartialWrite {
            message: Box::new(message),
            reason: last_error,
        })
    }

    /// Messages of a thread in replay order. An unknown thread yields an empty list.
    pub async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        self.store.list_messages(thread_id).await
    }

    // Reconciliation

    /// Re-derive a thread's recency marker from its messages.
    ///
    /// The marker is replaced only if it still holds the value that was
    /// read, and the result is read back before reporting success, so a
    /// concurrent append is never overwritten with a stale value.
    /// Returns `true` if the stored marker had diverged and now matches.
    pub async fn reconcile_thread(&self, thread_id: &str) -> Result<bool> {
        let mut repaired = false;
        for _ in 0..MAX_RECONCILE_ROUNDS {
            let thread = self.get_thread(thread_id).await?;
            let latest = self.store.latest_message_at(thread_id).await?;

            if thread.last_message_at == latest {
                return Ok(repaired);
            }

            tracing::warn!(
                thread_id = %thread_id,
                stored = ?thread.last_message_at,
                derived = ?latest,
                "Repairing diverged recency marker"
            );
            repaired |= self
                .store
                .sync_last_message_at(thread_id, thread.last_message_at, latest)
                .await?;
        }

        Err(PersistError::Internal(format!(
            "Recency marker of thread {} did not converge",
            thread_id
        )))
    }

    /// Reconcile every thread and purge records orphaned by interrupted
    /// non-transactional writes.
    ///
    /// A thread that fails to reconcile does not stop the sweep; once every
    /// thread has been visited, failures are reported as
    /// [`PersistError::ReconcileIncomplete`]. Threads deleted while the
    /// sweep runs are skipped.
    pub async fn reconcile_all(&self) -> Result<ReconcileReport> {
        let started = Utc::now();
        let mut report = ReconcileReport::default();
        let mut failed = 0;

        for thread_id in self.store.list_thread_ids().await? {
            match self.reconcile_thread(&thread_id).await {
                Ok(true) => report.repaired += 1,
                Ok(false) | Err(PersistError::NotFound { .. }) => {}
                Err(e) => {
                    tracing::warn!(thread_id = %thread_id, "Reconcile failed: {}", e);
                    failed += 1;
                }
            }
        }

        match self.store.purge_orphans(started).await {
            Ok(purged) => report.purged = purged,
            Err(e) => {
                tracing::warn!("Orphan purge failed: {}", e);
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(PersistError::ReconcileIncomplete {
                repaired: report.repaired,
                failed,
            });
        }
        if report.repaired > 0 || report.purged > 0 {
            tracing::info!(
                repaired = report.repaired,
                purged = report.purged,
                "Reconciled recency markers"
            );
        }
        Ok(report)
    }
}

/// Outcome of a full [`ConsoleClient::reconcile_all`] sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileReport {
    /// Threads whose recency marker was rewritten
    pub repaired: usize,
    /// Orphaned threads and messages removed
    pub purged: u64,
}

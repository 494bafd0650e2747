use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::error::UNKNOWN_TRANSACTION_COMMIT_RESULT;
use mongodb::{bson::doc, Client, ClientSession};

use crate::dbs::mongo::errors::is_transient;
use crate::dbs::mongo::repositories::{
    MongoMessageRepository, MongoProjectRepository, MongoThreadRepository,
};
use crate::error::{PersistError, Result};
use crate::models::{Message, Project, Thread};
use crate::trait_client::PersistenceClient;

const MAX_TRANSACTION_ATTEMPTS: u32 = 5;
const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Run a multi-step write as one unit, rerunning it when the server reports
/// a transient transaction error (write conflict, failover).
macro_rules! unit_of_work {
    ($client:expr, |$session:ident| $body:expr) => {{
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut $session = $client.begin().await?;
            let outcome = $body;
            match $client.finish(&mut $session, outcome).await {
                Err(e) if is_transient(&e) && attempt < MAX_TRANSACTION_ATTEMPTS => {
                    tracing::debug!("Retrying transaction (attempt {}): {}", attempt, e);
                }
                other => break other,
            }
        }
    }};
}

/// MongoDB-backed store.
///
/// With `transactions` enabled (requires a replica set) every multi-document
/// write runs in one transaction. Without it the writes are sequential,
/// children before parents, and a message whose thread could not be
/// updated is reported as [`PersistError::PartialWrite`].
pub struct MongoPersistenceClient {
    client: Client,
    database: String,
    transactions: bool,
    project_repo: MongoProjectRepository,
    thread_repo: MongoThreadRepository,
    message_repo: MongoMessageRepository,
}

impl MongoPersistenceClient {
    /// Connect to MongoDB, create the client and make sure indexes exist
    pub async fn connect(mongodb_uri: &str, database: &str, transactions: bool) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        let persist = Self {
            project_repo: MongoProjectRepository::new(&client, database),
            thread_repo: MongoThreadRepository::new(&client, database),
            message_repo: MongoMessageRepository::new(&client, database),
            client,
            database: database.to_string(),
            transactions,
        };
        persist.ensure_indexes().await?;

        tracing::info!(
            database = %database,
            transactions = transactions,
            "MongoDB store ready"
        );
        Ok(persist)
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        self.project_repo.ensure_indexes().await?;
        self.thread_repo.ensure_indexes().await?;
        self.message_repo.ensure_indexes().await?;
        Ok(())
    }

    async fn begin(&self) -> Result<ClientSession> {
        let mut session = self.client.start_session().await?;
        if self.transactions {
            session.start_transaction().await?;
        }
        Ok(session)
    }

    async fn finish<T>(&self, session: &mut ClientSession, outcome: Result<T>) -> Result<T> {
        if !self.transactions {
            return outcome;
        }
        match outcome {
            Ok(value) => {
                let mut attempt = 0;
                loop {
                    attempt += 1;
                    match session.commit_transaction().await {
                        Ok(()) => return Ok(value),
                        Err(e)
                            if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                                && attempt < MAX_COMMIT_ATTEMPTS =>
                        {
                            tracing::debug!("Retrying commit (attempt {}): {}", attempt, e);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            Err(e) => {
                if let Err(abort) = session.abort_transaction().await {
                    tracing::warn!("Failed to abort transaction: {}", abort);
                }
                Err(e)
            }
        }
    }

    async fn insert_thread_in(&self, session: &mut ClientSession, thread: &Thread) -> Result<()> {
        if self
            .project_repo
            .get_in(session, &thread.project_id)
            .await?
            .is_none()
        {
            return Err(PersistError::project_not_found(&thread.project_id));
        }
        self.thread_repo.insert_in(&mut *session, thread).await?;

        // Without a transaction a concurrent project delete may have run
        // between the check and the insert; undo rather than leave an orphan
        if !self.transactions
            && self
                .project_repo
                .get_in(&mut *session, &thread.project_id)
                .await?
                .is_none()
        {
            self.thread_repo.delete_in(session, &thread.id).await?;
            return Err(PersistError::project_not_found(&thread.project_id));
        }
        Ok(())
    }

    async fn delete_project_in(&self, session: &mut ClientSession, project_id: &str) -> Result<bool> {
        let thread_ids = self.thread_repo.ids_for_project_in(session, project_id).await?;
        let messages = self
            .message_repo
            .delete_for_threads_in(session, &thread_ids)
            .await?;
        let threads = self
            .thread_repo
            .delete_for_project_in(session, project_id)
            .await?;
        let deleted = self.project_repo.delete_in(session, project_id).await?;

        tracing::debug!(
            project_id = %project_id,
            threads = threads,
            messages = messages,
            "Cascaded project delete"
        );
        Ok(deleted)
    }

    async fn delete_thread_in(&self, session: &mut ClientSession, thread_id: &str) -> Result<bool> {
        self.message_repo
            .delete_for_threads_in(session, &[thread_id.to_string()])
            .await?;
        self.thread_repo.delete_in(session, thread_id).await
    }

    async fn append_message_in(
        &self,
        session: &mut ClientSession,
        mut message: Message,
    ) -> Result<Message> {
        let thread = self
            .thread_repo
            .get_in(session, &message.thread_id)
            .await?
            .ok_or_else(|| PersistError::thread_not_found(&message.thread_id))?;

        let floor = thread
            .last_message_at
            .map_or(thread.updated_at, |last| last.max(thread.updated_at));
        message.created_at = message.created_at.max(floor);

        self.message_repo.insert_in(&mut *session, &message).await?;

        match self
            .thread_repo
            .advance_in(&mut *session, &message.thread_id, message.created_at)
            .await
        {
            Ok(()) => Ok(message),
            // Inside a transaction the insert is rolled back with the abort
            Err(e) if self.transactions => Err(e),
            // The thread was deleted after it was read: drop the message too
            Err(PersistError::NotFound { .. }) => {
                self.message_repo.delete_in(session, &message.id).await?;
                Err(PersistError::thread_not_found(&message.thread_id))
            }
            Err(e) => Err(PersistError::PartialWrite {
                message: Box::new(message),
                reason: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PersistenceClient for MongoPersistenceClient {
    async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    async fn insert_project(&self, project: Project) -> Result<Project> {
        self.project_repo.insert(&project).await?;
        Ok(project)
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        self.project_repo.get(project_id).await
    }

    async fn get_project_by_slug(&self, slug: &str) -> Result<Option<Project>> {
        self.project_repo.get_by_slug(slug).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.project_repo.list().await
    }

    async fn update_project(&self, project: Project) -> Result<Project> {
        if !self.project_repo.update(&project).await? {
            return Err(PersistError::project_not_found(&project.id));
        }
        self.project_repo
            .get(&project.id)
            .await?
            .ok_or_else(|| PersistError::project_not_found(&project.id))
    }

    async fn delete_project(&self, project_id: &str) -> Result<bool> {
        unit_of_work!(self, |session| self.delete_project_in(&mut session, project_id).await)
    }

    async fn insert_thread(&self, thread: Thread) -> Result<Thread> {
        unit_of_work!(self, |session| self.insert_thread_in(&mut session, &thread).await)?;
        Ok(thread)
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        self.thread_repo.get(thread_id).await
    }

    async fn find_thread_by_external_ref(&self, external_ref: &str) -> Result<Option<Thread>> {
        self.thread_repo.find_by_external_ref(external_ref).await
    }

    async fn list_threads(&self, project_id: &str) -> Result<Vec<Thread>> {
        self.thread_repo.list_for_project(project_id).await
    }

    async fn list_thread_ids(&self) -> Result<Vec<String>> {
        self.thread_repo.ids().await
    }

    async fn update_thread(&self, thread: Thread) -> Result<Thread> {
        if !self.thread_repo.update(&thread).await? {
            return Err(PersistError::thread_not_found(&thread.id));
        }
        self.thread_repo
            .get(&thread.id)
            .await?
            .ok_or_else(|| PersistError::thread_not_found(&thread.id))
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<bool> {
        unit_of_work!(self, |session| self.delete_thread_in(&mut session, thread_id).await)
    }

    async fn append_message(&self, message: Message) -> Result<Message> {
        unit_of_work!(self, |session| {
            self.append_message_in(&mut session, message.clone()).await
        })
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        self.message_repo.list(thread_id).await
    }

    async fn latest_message_at(&self, thread_id: &str) -> Result<Option<DateTime<Utc>>> {
        self.message_repo.latest_created_at(thread_id).await
    }

    async fn sync_last_message_at(
        &self,
        thread_id: &str,
        expected: Option<DateTime<Utc>>,
        last_message_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        self.thread_repo
            .sync_last_message_at(thread_id, expected, last_message_at)
            .await
    }

    async fn purge_orphans(&self, created_before: DateTime<Utc>) -> Result<u64> {
        let project_ids = self.project_repo.ids().await?;
        let orphan_threads = self
            .thread_repo
            .orphan_ids(&project_ids, created_before)
            .await?;
        let threads = self.thread_repo.delete_ids(&orphan_threads).await?;

        // Messages of the threads removed above are swept here as well
        let thread_ids = self.thread_repo.ids().await?;
        let messages = self
            .message_repo
            .delete_orphans(&thread_ids, created_before)
            .await?;

        if threads + messages > 0 {
            tracing::warn!(
                threads = threads,
                messages = messages,
                "Purged orphaned records"
            );
        }
        Ok(threads + messages)
    }
}

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use console_persist::{
    ConsoleClient, MemoryPersistenceClient, Message, NewMessage, NewProject, NewThread,
    PersistError, PersistenceClient, Project, ReconcileReport, Result, Thread,
};

/// Memory store with injectable faults:
/// - `split_writes`: messages are inserted but the thread marker is left behind
/// - `failures`: the next N marker repairs fail
/// - `broken_thread`: marker repairs for this thread always fail
struct FaultyStore {
    inner: MemoryPersistenceClient,
    split_writes: bool,
    failures: AtomicU32,
    broken_thread: Mutex<Option<String>>,
}

impl FaultyStore {
    fn new(split_writes: bool, failures: u32) -> Self {
        Self {
            inner: MemoryPersistenceClient::new(),
            split_writes,
            failures: AtomicU32::new(failures),
            broken_thread: Mutex::new(None),
        }
    }

    fn break_thread(&self, thread_id: &str) {
        *self.broken_thread.lock().unwrap() = Some(thread_id.to_string());
    }
}

#[async_trait]
impl PersistenceClient for FaultyStore {
    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }

    async fn insert_project(&self, project: Project) -> Result<Project> {
        self.inner.insert_project(project).await
    }

    async fn get_project(&self, project_id: &str) -> Result<Option<Project>> {
        self.inner.get_project(project_id).await
    }

    async fn get_project_by_slug(&self, slug: &str) -> Result<Option<Project>> {
        self.inner.get_project_by_slug(slug).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        self.inner.list_projects().await
    }

    async fn update_project(&self, project: Project) -> Result<Project> {
        self.inner.update_project(project).await
    }

    async fn delete_project(&self, project_id: &str) -> Result<bool> {
        self.inner.delete_project(project_id).await
    }

    async fn insert_thread(&self, thread: Thread) -> Result<Thread> {
        self.inner.insert_thread(thread).await
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Option<Thread>> {
        self.inner.get_thread(thread_id).await
    }

    async fn find_thread_by_external_ref(&self, external_ref: &str) -> Result<Option<Thread>> {
        self.inner.find_thread_by_external_ref(external_ref).await
    }

    async fn list_threads(&self, project_id: &str) -> Result<Vec<Thread>> {
        self.inner.list_threads(project_id).await
    }

    async fn list_thread_ids(&self) -> Result<Vec<String>> {
        self.inner.list_thread_ids().await
    }

    async fn update_thread(&self, thread: Thread) -> Result<Thread> {
        self.inner.update_thread(thread).await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<bool> {
        self.inner.delete_thread(thread_id).await
    }

    async fn append_message(&self, message: Message) -> Result<Message> {
        if !self.split_writes {
            return self.inner.append_message(message).await;
        }

        // Insert through the inner store, then put the marker back so the
        // thread looks like the second write never happened
        let previous = self
            .inner
            .get_thread(&message.thread_id)
            .await?
            .and_then(|t| t.last_message_at);
        let message = self.inner.append_message(message).await?;
        self.inner
            .sync_last_message_at(&message.thread_id, Some(message.created_at), previous)
            .await?;
        Err(PersistError::PartialWrite {
            message: Box::new(message),
            reason: "thread update timed out".to_string(),
        })
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>> {
        self.inner.list_messages(thread_id).await
    }

    async fn latest_message_at(&self, thread_id: &str) -> Result<Option<DateTime<Utc>>> {
        self.inner.latest_message_at(thread_id).await
    }

    async fn sync_last_message_at(
        &self,
        thread_id: &str,
        expected: Option<DateTime<Utc>>,
        last_message_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        if self.broken_thread.lock().unwrap().as_deref() == Some(thread_id) {
            return Err(PersistError::Connection("shard unavailable".to_string()));
        }
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PersistError::Connection("store unavailable".to_string()));
        }
        self.inner
            .sync_last_message_at(thread_id, expected, last_message_at)
            .await
    }

    async fn purge_orphans(&self, created_before: DateTime<Utc>) -> Result<u64> {
        self.inner.purge_orphans(created_before).await
    }
}

async fn setup(failures: u32, retry_attempts: u32) -> (ConsoleClient, Thread) {
    let client = ConsoleClient::new(Arc::new(FaultyStore::new(true, failures)))
        .with_retry_attempts(retry_attempts);
    let project = client
        .create_project(NewProject::new("Flaky", "flaky", "flaky"))
        .await
        .unwrap();
    let thread = client.create_thread(NewThread::new(&project.id)).await.unwrap();
    (client, thread)
}

#[tokio::test]
async fn test_partial_write_repaired_immediately() {
    let (client, thread) = setup(0, 3).await;

    let message = client
        .create_message(NewMessage::new(&thread.id, "user", "hello"))
        .await
        .unwrap();

    let thread = client.get_thread(&thread.id).await.unwrap();
    assert_eq!(thread.last_message_at, Some(message.created_at));
}

#[tokio::test]
async fn test_partial_write_repaired_after_retries() {
    let (client, thread) = setup(2, 3).await;

    let message = client
        .create_message(NewMessage::new(&thread.id, "user", "hello"))
        .await
        .unwrap();

    let thread = client.get_thread(&thread.id).await.unwrap();
    assert_eq!(thread.last_message_at, Some(message.created_at));
}

#[tokio::test]
async fn test_partial_write_surfaces_when_retries_exhausted() {
    let (client, thread) = setup(4, 2).await;

    let err = client
        .create_message(NewMessage::new(&thread.id, "user", "hello"))
        .await
        .unwrap_err();

    let message = match err {
        PersistError::PartialWrite { message, .. } => message,
        other => panic!("expected partial write, got {:?}", other),
    };
    assert_eq!(client.list_messages(&thread.id).await.unwrap(), vec![*message.clone()]);
    assert_eq!(client.get_thread(&thread.id).await.unwrap().last_message_at, None);

    // Two injected failures remain for the sweeper
    assert!(matches!(
        client.reconcile_all().await,
        Err(PersistError::ReconcileIncomplete { repaired: 0, failed: 1 })
    ));
    assert!(client.reconcile_all().await.is_err());
    assert_eq!(client.reconcile_all().await.unwrap().repaired, 1);
    assert_eq!(
        client.get_thread(&thread.id).await.unwrap().last_message_at,
        Some(message.created_at)
    );
}

#[tokio::test]
async fn test_sweep_continues_past_failing_thread() {
    let store = Arc::new(FaultyStore::new(false, 0));
    let client = ConsoleClient::new(store.clone());
    let project = client
        .create_project(NewProject::new("Sweep", "sweep", "sweep"))
        .await
        .unwrap();

    let mut threads = Vec::new();
    for title in ["first", "second", "third"] {
        let thread = client
            .create_thread(NewThread::new(&project.id).title(title))
            .await
            .unwrap();
        let message = client
            .create_message(NewMessage::new(&thread.id, "user", title))
            .await
            .unwrap();
        // Knock every marker out of sync
        assert!(client
            .store()
            .sync_last_message_at(&thread.id, Some(message.created_at), None)
            .await
            .unwrap());
        threads.push((thread, message));
    }
    store.break_thread(&threads[1].0.id);

    let err = client.reconcile_all().await.unwrap_err();
    assert!(matches!(
        err,
        PersistError::ReconcileIncomplete { repaired: 2, failed: 1 }
    ));

    for (i, (thread, message)) in threads.iter().enumerate() {
        let stored = client.get_thread(&thread.id).await.unwrap();
        if i == 1 {
            assert_eq!(stored.last_message_at, None);
        } else {
            assert_eq!(stored.last_message_at, Some(message.created_at));
        }
    }

    *store.broken_thread.lock().unwrap() = None;
    assert_eq!(
        client.reconcile_all().await.unwrap(),
        ReconcileReport {
            repaired: 1,
            purged: 0
        }
    );
}

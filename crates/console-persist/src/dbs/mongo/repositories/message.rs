use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::options::IndexOptions;
use mongodb::{bson::doc, Client, ClientSession, Collection, IndexModel};

use crate::dbs::mongo::models::MongoMessage;
use crate::error::Result;
use crate::models::Message;

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let timeline = IndexModel::builder()
            .keys(doc! { "thread_id": 1, "created_at": 1 })
            .options(
                IndexOptions::builder()
                    .name("messages_thread_id_created_at_idx".to_string())
                    .build(),
            )
            .build();
        self.collection.create_index(timeline).await?;
        Ok(())
    }

    pub async fn insert_in(&self, session: &mut ClientSession, message: &Message) -> Result<()> {
        self.collection
            .insert_one(MongoMessage::from(message.clone()))
            .session(session)
            .await?;
        Ok(())
    }

    /// All messages for a thread, oldest first
    pub async fn list(&self, thread_id: &str) -> Result<Vec<Message>> {
        let filter = doc! { "thread_id": thread_id };
        let messages: Vec<MongoMessage> = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": 1, "_id": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages.into_iter().map(Into::into).collect())
    }

    pub async fn latest_created_at(&self, thread_id: &str) -> Result<Option<DateTime<Utc>>> {
        let filter = doc! { "thread_id": thread_id };
        let latest = self
            .collection
            .find_one(filter)
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(latest.map(|m| m.created_at.to_chrono()))
    }

    pub async fn delete_for_threads_in(
        &self,
        session: &mut ClientSession,
        thread_ids: &[String],
    ) -> Result<u64> {
        if thread_ids.is_empty() {
            return Ok(0);
        }
        let filter = doc! { "thread_id": { "$in": thread_ids.to_vec() } };
        let result = self.collection.delete_many(filter).session(session).await?;
        Ok(result.deleted_count)
    }

    /// Compensating delete for a message whose thread vanished mid-write
    pub async fn delete_in(&self, session: &mut ClientSession, message_id: &str) -> Result<bool> {
        let filter = doc! { "_id": message_id };
        let result = self.collection.delete_one(filter).session(session).await?;
        Ok(result.deleted_count > 0)
    }

    /// Delete messages older than `created_before` whose thread is not in
    /// `thread_ids`
    pub async fn delete_orphans(
        &self,
        thread_ids: &[String],
        created_before: DateTime<Utc>,
    ) -> Result<u64> {
        let filter = doc! {
            "thread_id": { "$nin": thread_ids.to_vec() },
            "created_at": { "$lt": bson::DateTime::from_chrono(created_before) },
        };
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }
}

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::options::IndexOptions;
use mongodb::{bson, bson::doc, bson::Bson, Client, ClientSession, Collection, IndexModel};

use crate::dbs::mongo::models::MongoThread;
use crate::error::{PersistError, Result};
use crate::models::Thread;
use crate::ordering::thread_order;

#[derive(Clone)]
pub struct MongoThreadRepository {
    collection: Collection<MongoThread>,
}

impl MongoThreadRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("threads");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let recency = IndexModel::builder()
            .keys(doc! { "project_id": 1, "last_message_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("threads_project_id_last_message_at_idx".to_string())
                    .build(),
            )
            .build();
        let external_ref = IndexModel::builder()
            .keys(doc! { "external_ref": 1 })
            .options(
                IndexOptions::builder()
                    .name("threads_external_ref_idx".to_string())
                    .build(),
            )
            .build();
        self.collection.create_indexes([recency, external_ref]).await?;
        Ok(())
    }

    pub async fn insert_in(&self, session: &mut ClientSession, thread: &Thread) -> Result<()> {
        self.collection
            .insert_one(MongoThread::from(thread.clone()))
            .session(session)
            .await?;
        Ok(())
    }

    pub async fn get(&self, thread_id: &str) -> Result<Option<Thread>> {
        let filter = doc! { "_id": thread_id };
        Ok(self.collection.find_one(filter).await?.map(Into::into))
    }

    pub async fn get_in(
        &self,
        session: &mut ClientSession,
        thread_id: &str,
    ) -> Result<Option<Thread>> {
        let filter = doc! { "_id": thread_id };
        Ok(self
            .collection
            .find_one(filter)
            .session(session)
            .await?
            .map(Into::into))
    }

    pub async fn find_by_external_ref(&self, external_ref: &str) -> Result<Option<Thread>> {
        let filter = doc! { "external_ref": external_ref };
        Ok(self.collection.find_one(filter).await?.map(Into::into))
    }

    /// Null sorts lowest in MongoDB, so a descending sort on
    /// `last_message_at` already puts threads without messages last.
    pub async fn list_for_project(&self, project_id: &str) -> Result<Vec<Thread>> {
        let filter = doc! { "project_id": project_id };
        let threads: Vec<MongoThread> = self
            .collection
            .find(filter)
            .sort(doc! { "last_message_at": -1, "created_at": -1, "_id": 1 })
            .await?
            .try_collect()
            .await?;

        let mut threads: Vec<Thread> = threads.into_iter().map(Into::into).collect();
        threads.sort_by(thread_order);
        Ok(threads)
    }

    pub async fn ids(&self) -> Result<Vec<String>> {
        let ids = self.collection.distinct("_id", doc! {}).await?;
        Ok(ids
            .into_iter()
            .filter_map(|id| id.as_str().map(str::to_owned))
            .collect())
    }

    pub async fn ids_for_project_in(
        &self,
        session: &mut ClientSession,
        project_id: &str,
    ) -> Result<Vec<String>> {
        let ids = self
            .collection
            .distinct("_id", doc! { "project_id": project_id })
            .session(session)
            .await?;
        Ok(ids
            .into_iter()
            .filter_map(|id| id.as_str().map(str::to_owned))
            .collect())
    }

    /// Returns `false` if no thread matched
    pub async fn update(&self, thread: &Thread) -> Result<bool> {
        let filter = doc! { "_id": thread.id.as_str() };
        let update = doc! {
            "$set": {
                "title": thread.title.as_str(),
                "mode_hint": thread.mode_hint.clone(),
                "is_archived": thread.is_archived,
                "is_pinned": thread.is_pinned,
            },
            "$max": { "updated_at": bson::DateTime::from_chrono(thread.updated_at) }
        };
        let result = self.collection.update_one(filter, update).await?;
        Ok(result.matched_count > 0)
    }

    /// Move the recency marker and `updated_at` forward to `at`.
    ///
    /// `$max` keeps a slower concurrent writer from moving the marker back.
    pub async fn advance_in(
        &self,
        session: &mut ClientSession,
        thread_id: &str,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let at = bson::DateTime::from_chrono(at);
        let filter = doc! { "_id": thread_id };
        let update = doc! { "$max": { "last_message_at": at, "updated_at": at } };
        let result = self
            .collection
            .update_one(filter, update)
            .session(session)
            .await?;
        if result.matched_count == 0 {
            return Err(PersistError::thread_not_found(thread_id));
        }
        Ok(())
    }

    /// Compare-and-set of the recency marker; see
    /// [`crate::PersistenceClient::sync_last_message_at`]
    pub async fn sync_last_message_at(
        &self,
        thread_id: &str,
        expected: Option<DateTime<Utc>>,
        last_message_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let expected = match expected {
            Some(at) => Bson::DateTime(bson::DateTime::from_chrono(at)),
            None => Bson::Null,
        };
        let filter = doc! { "_id": thread_id, "last_message_at": expected };
        let update = match last_message_at {
            Some(at) => {
                let at = bson::DateTime::from_chrono(at);
                doc! { "$set": { "last_message_at": at }, "$max": { "updated_at": at } }
            }
            None => doc! { "$set": { "last_message_at": Bson::Null } },
        };
        let result = self.collection.update_one(filter, update).await?;
        if result.matched_count > 0 {
            return Ok(true);
        }
        if self.get(thread_id).await?.is_none() {
            return Err(PersistError::thread_not_found(thread_id));
        }
        Ok(false)
    }

    /// Threads older than `created_before` whose project is not in `project_ids`
    pub async fn orphan_ids(
        &self,
        project_ids: &[String],
        created_before: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let filter = doc! {
            "project_id": { "$nin": project_ids.to_vec() },
            "created_at": { "$lt": bson::DateTime::from_chrono(created_before) },
        };
        let ids = self.collection.distinct("_id", filter).await?;
        Ok(ids
            .into_iter()
            .filter_map(|id| id.as_str().map(str::to_owned))
            .collect())
    }

    pub async fn delete_ids(&self, thread_ids: &[String]) -> Result<u64> {
        if thread_ids.is_empty() {
            return Ok(0);
        }
        let filter = doc! { "_id": { "$in": thread_ids.to_vec() } };
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    pub async fn delete_in(&self, session: &mut ClientSession, thread_id: &str) -> Result<bool> {
        let filter = doc! { "_id": thread_id };
        let result = self.collection.delete_one(filter).session(session).await?;
        Ok(result.deleted_count > 0)
    }

    pub async fn delete_for_project_in(
        &self,
        session: &mut ClientSession,
        project_id: &str,
    ) -> Result<u64> {
        let filter = doc! { "project_id": project_id };
        let result = self.collection.delete_many(filter).session(session).await?;
        Ok(result.deleted_count)
    }
}

use futures::TryStreamExt;
use mongodb::options::IndexOptions;
use mongodb::{bson::doc, Client, ClientSession, Collection, IndexModel};

use crate::dbs::mongo::errors::violates_unique_index;
use crate::dbs::mongo::models::MongoProject;
use crate::error::{PersistError, Result};
use crate::models::Project;

const SLUG_INDEX: &str = "projects_slug_unique";

#[derive(Clone)]
pub struct MongoProjectRepository {
    collection: Collection<MongoProject>,
}

impl MongoProjectRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("projects");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let slug = IndexModel::builder()
            .keys(doc! { "slug": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name(SLUG_INDEX.to_string())
                    .build(),
            )
            .build();
        self.collection.create_index(slug).await?;
        Ok(())
    }

    /// Insert a project; a taken slug is reported as `Conflict`
    pub async fn insert(&self, project: &Project) -> Result<()> {
        match self.collection.insert_one(MongoProject::from(project.clone())).await {
            Ok(_) => Ok(()),
            Err(e) if violates_unique_index(&e, SLUG_INDEX) => {
                Err(PersistError::duplicate_slug(&project.slug))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, project_id: &str) -> Result<Option<Project>> {
        let filter = doc! { "_id": project_id };
        Ok(self.collection.find_one(filter).await?.map(Into::into))
    }

    pub async fn get_in(
        &self,
        session: &mut ClientSession,
        project_id: &str,
    ) -> Result<Option<Project>> {
        let filter = doc! { "_id": project_id };
        Ok(self
            .collection
            .find_one(filter)
            .session(session)
            .await?
            .map(Into::into))
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Project>> {
        let filter = doc! { "slug": slug };
        Ok(self.collection.find_one(filter).await?.map(Into::into))
    }

    /// Binary string comparison (no collation) gives byte order on names
    pub async fn list(&self) -> Result<Vec<Project>> {
        let projects: Vec<MongoProject> = self
            .collection
            .find(doc! {})
            .sort(doc! { "name": 1, "_id": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(projects.into_iter().map(Into::into).collect())
    }

    pub async fn ids(&self) -> Result<Vec<String>> {
        let ids = self.collection.distinct("_id", doc! {}).await?;
        Ok(ids
            .into_iter()
            .filter_map(|id| id.as_str().map(str::to_owned))
            .collect())
    }

    /// Returns `false` if no project matched
    pub async fn update(&self, project: &Project) -> Result<bool> {
        let filter = doc! { "_id": project.id.as_str() };
        let update = doc! {
            "$set": {
                "name": project.name.as_str(),
                "description": project.description.clone(),
                "icon": project.icon.clone(),
                "color": project.color.clone(),
                "updated_at": bson::DateTime::from_chrono(project.updated_at),
            }
        };
        let result = self.collection.update_one(filter, update).await?;
        Ok(result.matched_count > 0)
    }

    pub async fn delete_in(&self, session: &mut ClientSession, project_id: &str) -> Result<bool> {
        let filter = doc! { "_id": project_id };
        let result = self.collection.delete_one(filter).session(session).await?;
        Ok(result.deleted_count > 0)
    }
}

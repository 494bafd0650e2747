use std::sync::Arc;

use crate::client::{ConsoleClient, DEFAULT_RETRY_ATTEMPTS};
use crate::dbs::MemoryPersistenceClient;
use crate::error::{PersistError, Result};
use crate::trait_client::PersistenceClient;

/// Which store backs the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    #[default]
    Memory,
    MongoDb,
}

impl std::str::FromStr for StorageBackend {
    type Err = PersistError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "mongodb" | "mongo" => Ok(StorageBackend::MongoDb),
            other => Err(PersistError::Internal(format!(
                "Unknown storage backend: {}",
                other
            ))),
        }
    }
}

#[cfg_attr(not(feature = "mongodb"), allow(dead_code))]
pub struct ConsoleClientBuilder {
    backend: StorageBackend,
    mongodb_uri: Option<String>,
    database: Option<String>,
    transactions: bool,
    retry_attempts: u32,
}

impl ConsoleClientBuilder {
    pub fn new() -> Self {
        Self {
            backend: StorageBackend::Memory,
            mongodb_uri: None,
            database: None,
            transactions: true,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }

    pub fn backend(mut self, backend: StorageBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn mongodb_uri(mut self, uri: impl Into<String>) -> Self {
        self.mongodb_uri = Some(uri.into());
        self
    }

    pub fn database(mut self, db: impl Into<String>) -> Self {
        self.database = Some(db.into());
        self
    }

    /// Multi-document transactions need a replica set; turn off for a standalone server
    pub fn transactions(mut self, enabled: bool) -> Self {
        self.transactions = enabled;
        self
    }

    pub fn retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub async fn build(self) -> Result<ConsoleClient> {
        let store: Arc<dyn PersistenceClient> = match self.backend {
            StorageBackend::Memory => Arc::new(MemoryPersistenceClient::new()),
            StorageBackend::MongoDb => self.connect_mongodb().await?,
        };
        Ok(ConsoleClient::new(store).with_retry_attempts(self.retry_attempts))
    }

    #[cfg(feature = "mongodb")]
    async fn connect_mongodb(&self) -> Result<Arc<dyn PersistenceClient>> {
        let mongodb_uri = self
            .mongodb_uri
            .as_deref()
            .ok_or_else(|| PersistError::Internal("mongodb_uri is required".to_string()))?;
        let database = self
            .database
            .as_deref()
            .ok_or_else(|| PersistError::Internal("database is required".to_string()))?;

        let client = crate::dbs::MongoPersistenceClient::connect(
            mongodb_uri,
            database,
            self.transactions,
        )
        .await?;
        Ok(Arc::new(client))
    }

    #[cfg(not(feature = "mongodb"))]
    async fn connect_mongodb(&self) -> Result<Arc<dyn PersistenceClient>> {
        Err(PersistError::Internal(
            "console-persist was built without the `mongodb` feature".to_string(),
        ))
    }
}

impl Default for ConsoleClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!("MongoDB".parse::<StorageBackend>().unwrap(), StorageBackend::MongoDb);
        assert!("postgres".parse::<StorageBackend>().is_err());
    }

    #[tokio::test]
    async fn test_memory_build() {
        let client = ConsoleClientBuilder::new().build().await.unwrap();
        assert!(client.ping().await.is_ok());
    }

    #[cfg(not(feature = "mongodb"))]
    #[tokio::test]
    async fn test_mongodb_requires_feature() {
        let result = ConsoleClientBuilder::new()
            .backend(StorageBackend::MongoDb)
            .build()
            .await;
        assert!(result.is_err());
    }
}

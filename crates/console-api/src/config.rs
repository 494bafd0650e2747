use config::{Config as ConfigLoader, ConfigError, Environment, File};
use console_persist::StorageBackend;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub mongodb_uri: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-request timeout
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// `memory` or `mongodb`
    pub backend: String,
    pub database: String,
    /// Multi-document transactions; needs a replica set
    #[serde(default = "default_transactions")]
    pub transactions: bool,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Interval of the background recency-marker sweep, 0 disables it
    #[serde(default)]
    pub reconcile_interval_secs: u64,
}

fn default_transactions() -> bool {
    true
}

fn default_retry_attempts() -> u32 {
    3
}

impl StorageConfig {
    pub fn backend(&self) -> Result<StorageBackend, ConfigError> {
        self.backend
            .parse()
            .map_err(|e: console_persist::PersistError| ConfigError::Message(e.to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables (`CONSOLE_` prefix, `__` between section and key)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            // 1. Load default config
            .add_source(File::with_name("config/default").required(false))
            // 2. Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // 3. Environment variables override everything,
            //    e.g. CONSOLE_STORAGE__BACKEND=mongodb
            .add_source(
                Environment::with_prefix("CONSOLE")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.origins")
                    .try_parsing(true),
            );

        let config = builder.build()?;

        let mut cfg: Config = config.try_deserialize()?;

        // Only the MongoDB backend needs a connection string
        if cfg.storage.backend()? == StorageBackend::MongoDb {
            cfg.mongodb_uri = std::env::var("MONGODB_URI").map_err(|_| {
                ConfigError::Message(
                    "MONGODB_URI environment variable is required for the mongodb backend"
                        .to_string(),
                )
            })?;
        }

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 3000

            [cors]
            enabled = true
            origins = ["http://localhost:3000"]

            [storage]
            backend = "mongodb"
            database = "console_test"
            transactions = false
            reconcile_interval_secs = 60

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.storage.database, "console_test");
        assert_eq!(config.storage.backend().unwrap(), StorageBackend::MongoDb);
        assert!(!config.storage.transactions);
        assert_eq!(config.storage.retry_attempts, 3);
        assert_eq!(config.storage.reconcile_interval_secs, 60);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let storage = StorageConfig {
            backend: "sqlite".to_string(),
            database: "console".to_string(),
            transactions: true,
            retry_attempts: 3,
            reconcile_interval_secs: 0,
        };
        assert!(storage.backend().is_err());
    }

    #[test]
    fn test_default_file_parses() {
        let config =
            Config::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml"))
                .unwrap();
        assert_eq!(config.storage.backend().unwrap(), StorageBackend::Memory);
        assert!(config.mongodb_uri.is_empty());
    }
}

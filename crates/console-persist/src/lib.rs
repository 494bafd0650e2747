pub mod builder;
pub mod client;
pub mod dbs;
pub mod error;
pub mod models;
pub mod ordering;
pub mod seed;
pub mod trait_client;

pub use builder::{ConsoleClientBuilder, StorageBackend};
pub use client::{ConsoleClient, ReconcileReport};
pub use dbs::MemoryPersistenceClient;
#[cfg(feature = "mongodb")]
pub use dbs::MongoPersistenceClient;
pub use error::{ErrorKind, PersistError, Result};
pub use models::{
    external_ref_for, Message, MessageRole, NewMessage, NewProject, NewThread, Project,
    ProjectPatch, Thread, ThreadPatch, DEFAULT_THREAD_TITLE,
};
pub use seed::{seed_demo_data, SeedOutcome, SeedReport};
pub use trait_client::PersistenceClient;

pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;

pub use memory::MemoryPersistenceClient;
#[cfg(feature = "mongodb")]
pub use mongo::MongoPersistenceClient;

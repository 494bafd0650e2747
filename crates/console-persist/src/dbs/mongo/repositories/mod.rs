pub mod message;
pub mod project;
pub mod thread;

pub use message::MongoMessageRepository;
pub use project::MongoProjectRepository;
pub use thread::MongoThreadRepository;

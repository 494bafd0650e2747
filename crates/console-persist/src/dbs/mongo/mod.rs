pub mod client;
mod errors;
pub mod models;
pub mod repositories;

pub use client::MongoPersistenceClient;

#![forbid(unsafe_code)]

pub mod quiz_store;
pub mod repository;
pub mod sqlite;

pub use quiz_store::QuizStore;
pub use repository::{InMemoryRepository, KeyValueStore, Storage, StorageError};

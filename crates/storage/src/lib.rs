#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, ResultRecord, ResultRepository, ResultRow, Storage, StorageError,
    UserRepository,
};

#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    CompletionLogRepository, CompletionRecord, CourseRepository, CourseSnapshot,
    InMemoryRepository, ProgressPersistence, Storage, StorageError,
};

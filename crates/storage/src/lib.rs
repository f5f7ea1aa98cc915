#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{AnswerMap, CachedSession, InMemoryCache, SessionCacheStore, StorageError};
pub use sqlite::{SqliteCache, SqliteInitError};

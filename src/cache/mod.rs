//! Local snapshot cache used as a fallback when the TaskNotes API is unreachable.
//!
//! This module provides:
//! - A key-value storage trait with a SQLite implementation that survives restarts
//! - `TaskCache`, which keeps the last successful task list plus its write time
//! - `CacheResult`, which tells callers whether data came from the network or the cache

mod layer;
mod storage;
mod traits;

pub use layer::{TaskCache, CACHE_KEY, CACHE_TIMESTAMP_KEY};
pub use storage::{CacheStorage, SqliteStorage};
pub use traits::{CacheResult, CacheSource};

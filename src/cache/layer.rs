//! Snapshot cache for the most recent successful task list.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::warn;

use super::storage::CacheStorage;
use crate::api::Task;

/// Storage key holding the JSON-serialized task list.
pub const CACHE_KEY: &str = "tasknotes_tasks";
/// Storage key holding the write time as decimal epoch milliseconds.
pub const CACHE_TIMESTAMP_KEY: &str = "tasknotes_tasks_timestamp";

/// Time-boxed cache of the last task list read from the API.
///
/// The snapshot is only ever replaced as a whole. Unreadable entries are
/// treated as missing, so callers never see a cache error on read.
pub struct TaskCache {
  storage: Arc<dyn CacheStorage>,
  /// How long before a snapshot is considered stale
  ttl: Duration,
}

impl TaskCache {
  /// Create a new task cache with the given storage backend.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    Self {
      storage: Arc::new(storage),
      ttl: Duration::minutes(5),
    }
  }

  /// Set the TTL for cached snapshots.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  /// The stored snapshot, or `None` if absent or unreadable.
  pub fn get_cached_tasks(&self) -> Option<Vec<Task>> {
    let raw = match self.storage.get_item(CACHE_KEY) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        warn!(error = %e, "Failed to read task cache");
        return None;
      }
    };

    match serde_json::from_str(&raw) {
      Ok(tasks) => Some(tasks),
      Err(e) => {
        warn!(error = %e, "Ignoring malformed task cache");
        None
      }
    }
  }

  /// Replace the snapshot and reset its write time to now.
  pub fn set_cached_tasks(&self, tasks: &[Task]) -> Result<()> {
    self.set_cached_tasks_at(tasks, Utc::now())
  }

  fn set_cached_tasks_at(&self, tasks: &[Task], now: DateTime<Utc>) -> Result<()> {
    let data =
      serde_json::to_string(tasks).map_err(|e| eyre!("Failed to serialize tasks: {}", e))?;
    let timestamp = now.timestamp_millis().to_string();

    self
      .storage
      .set_items(&[
        (CACHE_KEY, data.as_str()),
        (CACHE_TIMESTAMP_KEY, timestamp.as_str()),
      ])
  }

  /// When the current snapshot was written, if the stored timestamp is readable.
  pub fn cached_at(&self) -> Option<DateTime<Utc>> {
    let raw = match self.storage.get_item(CACHE_TIMESTAMP_KEY) {
      Ok(raw) => raw?,
      Err(e) => {
        warn!(error = %e, "Failed to read task cache timestamp");
        return None;
      }
    };

    let millis: i64 = raw.trim().parse().ok()?;
    DateTime::from_timestamp_millis(millis)
  }

  /// Whether a snapshot was written less than one TTL ago.
  pub fn is_cache_valid(&self) -> bool {
    self.is_cache_valid_at(Utc::now())
  }

  pub fn is_cache_valid_at(&self, now: DateTime<Utc>) -> bool {
    match self.cached_at() {
      Some(cached_at) => now - cached_at < self.ttl,
      None => false,
    }
  }

  /// Remove both the snapshot and its timestamp.
  pub fn clear_cache(&self) -> Result<()> {
    self.storage.remove_items(&[CACHE_KEY, CACHE_TIMESTAMP_KEY])
  }
}

impl Clone for TaskCache {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      ttl: self.ttl,
    }
  }
}

//! Cache storage trait and SQLite implementation.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Trait for string key-value storage backends.
pub trait CacheStorage: Send + Sync {
  /// Get the raw value stored under `key`.
  fn get_item(&self, key: &str) -> Result<Option<String>>;

  /// Store several entries atomically; either all are written or none are.
  fn set_items(&self, entries: &[(&str, &str)]) -> Result<()>;

  /// Remove entries. Missing keys are ignored.
  fn remove_items(&self, keys: &[&str]) -> Result<()>;
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open or create the cache database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open or create the cache database at the default location.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// In-memory database, gone when dropped.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::from_connection(conn)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    Ok(crate::config::data_dir()?.join("cache.db"))
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl CacheStorage for SqliteStorage {
  fn get_item(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry {}: {}", key, e))
  }

  fn set_items(&self, entries: &[(&str, &str)]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for (key, value) in entries {
      tx.execute(
        "INSERT OR REPLACE INTO kv_store (key, value, written_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to store cache entry {}: {}", key, e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn remove_items(&self, keys: &[&str]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for key in keys {
      tx.execute("DELETE FROM kv_store WHERE key = ?", params![key])
        .map_err(|e| eyre!("Failed to remove cache entry {}: {}", key, e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_get_missing_key() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    assert_eq!(storage.get_item("absent").unwrap(), None);
  }

  #[test]
  fn test_set_overwrites_and_remove() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.set_items(&[("a", "1"), ("b", "2")]).unwrap();
    storage.set_items(&[("a", "3")]).unwrap();

    assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("3"));
    assert_eq!(storage.get_item("b").unwrap().as_deref(), Some("2"));

    storage.remove_items(&["a", "never-written"]).unwrap();
    assert_eq!(storage.get_item("a").unwrap(), None);
    assert_eq!(storage.get_item("b").unwrap().as_deref(), Some("2"));
  }

  #[test]
  fn test_entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");

    {
      let storage = SqliteStorage::open(&path).unwrap();
      storage.set_items(&[("k", "v")]).unwrap();
    }

    let reopened = SqliteStorage::open(&path).unwrap();
    assert_eq!(reopened.get_item("k").unwrap().as_deref(), Some("v"));
  }
}

//! Key/value storage backends for the media cache.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::KeyValueStore;

/// Storage implementation that doesn't keep anything.
/// Used when caching is disabled - every read is a miss.
pub struct NoopStore;

impl KeyValueStore for NoopStore {
  fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
    Ok(()) // Discard
  }

  fn get_item(&self, _key: &str) -> Result<Option<String>> {
    Ok(None) // Always miss
  }

  fn remove_item(&self, _key: &str) -> Result<()> {
    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>> {
    Ok(Vec::new())
  }
}

/// SQLite-based key/value store.
///
/// `max_entries` emulates a storage quota: once the table holds that many
/// rows, writes of new keys are rejected until something is removed.
pub struct SqliteStore {
  conn: Mutex<Connection>,
  max_entries: Option<usize>,
}

impl SqliteStore {
  /// Open (or create) the store at the given path, or the default location.
  pub fn open(path: Option<&Path>, max_entries: Option<usize>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn, max_entries)
  }

  /// In-memory store, gone when dropped.
  pub fn open_in_memory(max_entries: Option<usize>) -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn, max_entries)
  }

  fn with_connection(conn: Connection, max_entries: Option<usize>) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
      max_entries,
    };
    store.run_migrations()?;
    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    Ok(crate::config::data_dir()?.join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl KeyValueStore for SqliteStore {
  fn set_item(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    if let Some(max) = self.max_entries {
      let exists: bool = conn
        .query_row(
          "SELECT EXISTS(SELECT 1 FROM kv_store WHERE key = ?)",
          params![key],
          |row| row.get(0),
        )
        .map_err(|e| eyre!("Failed to check key {}: {}", key, e))?;

      if !exists {
        let count: i64 = conn
          .query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))
          .map_err(|e| eyre!("Failed to count cache entries: {}", e))?;
        if count as usize >= max {
          return Err(eyre!("Storage quota exceeded ({} entries)", max));
        }
      }
    }

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value, written_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to store {}: {}", key, e))?;

    Ok(())
  }

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
      .map_err(|e| eyre!("Failed to read {}: {}", key, e))
  }

  fn remove_item(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM kv_store WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove {}: {}", key, e))?;

    Ok(())
  }

  fn keys(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT key FROM kv_store")
      .map_err(|e| eyre!("Failed to prepare key scan: {}", e))?;

    let keys = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to scan keys: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(keys)
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sqlite_set_get_remove() {
    let store = SqliteStore::open_in_memory(None).unwrap();

    store.set_item("a", "1").unwrap();
    assert_eq!(store.get_item("a").unwrap(), Some("1".to_string()));

    store.set_item("a", "2").unwrap();
    assert_eq!(store.get_item("a").unwrap(), Some("2".to_string()));

    store.remove_item("a").unwrap();
    assert_eq!(store.get_item("a").unwrap(), None);

    // Removing again is fine
    store.remove_item("a").unwrap();
  }

  #[test]
  fn test_sqlite_keys() {
    let store = SqliteStore::open_in_memory(None).unwrap();
    store.set_item("x", "1").unwrap();
    store.set_item("y", "2").unwrap();

    let mut keys = store.keys().unwrap();
    keys.sort();
    assert_eq!(keys, vec!["x".to_string(), "y".to_string()]);
  }

  #[test]
  fn test_sqlite_quota_rejects_new_keys() {
    let store = SqliteStore::open_in_memory(Some(2)).unwrap();
    store.set_item("a", "1").unwrap();
    store.set_item("b", "2").unwrap();

    assert!(store.set_item("c", "3").is_err());

    // Overwriting an existing key doesn't grow the table
    store.set_item("a", "updated").unwrap();

    store.remove_item("b").unwrap();
    store.set_item("c", "3").unwrap();
  }

  #[test]
  fn test_noop_store_always_misses() {
    let store = NoopStore;
    store.set_item("a", "1").unwrap();
    assert_eq!(store.get_item("a").unwrap(), None);
    assert!(store.keys().unwrap().is_empty());
  }
}

//! Persistent key-value storage for the session credential.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Key under which the session token is persisted.
pub const TOKEN_KEY: &str = "token";

/// Trait for client-persistent key-value storage backends.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>>;

  fn set(&self, key: &str, value: &str) -> Result<()>;

  fn remove(&self, key: &str) -> Result<()>;
}

/// Storage that keeps values only for the life of the process.
#[derive(Default)]
pub struct MemoryStore {
  values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let values = self
      .values
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(values.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let mut values = self
      .values
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    values.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let mut values = self
      .values
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    values.remove(key);
    Ok(())
  }
}

/// SQLite-backed key-value storage that survives restarts.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open (or create) the store inside the given data directory.
  pub fn open(data_dir: &Path) -> Result<Self> {
    let path = Self::path_in(data_dir);

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create data directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open storage at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a throwaway in-memory store.
  #[cfg(test)]
  pub fn in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory storage: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;
    Ok(store)
  }

  fn path_in(data_dir: &Path) -> PathBuf {
    data_dir.join("storage.db")
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(STORAGE_SCHEMA)
      .map_err(|e| eyre!("Failed to run storage migrations: {}", e))?;

    Ok(())
  }
}

const STORAGE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl KeyValueStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
        row.get(0)
      })
      .optional()
      .map_err(|e| eyre!("Failed to read {}: {}", key, e))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write {}: {}", key, e))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM kv WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove {}: {}", key, e))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sqlite_roundtrip_and_overwrite() {
    let store = SqliteStore::in_memory().unwrap();
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);

    store.set(TOKEN_KEY, "first").unwrap();
    store.set(TOKEN_KEY, "second").unwrap();
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("second"));

    store.remove(TOKEN_KEY).unwrap();
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
  }

  #[test]
  fn test_sqlite_remove_missing_key_is_ok() {
    let store = SqliteStore::in_memory().unwrap();
    assert!(store.remove("nothing").is_ok());
  }

  #[test]
  fn test_sqlite_persists_across_reopen() {
    let dir = std::env::temp_dir().join(format!("taskdeck-test-{}", std::process::id()));
    {
      let store = SqliteStore::open(&dir).unwrap();
      store.set(TOKEN_KEY, "persisted").unwrap();
    }
    let store = SqliteStore::open(&dir).unwrap();
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("persisted"));
    let _ = std::fs::remove_dir_all(&dir);
  }

  #[test]
  fn test_memory_store() {
    let store = MemoryStore::new();
    store.set("language", "en").unwrap();
    assert_eq!(store.get("language").unwrap().as_deref(), Some("en"));
    store.remove("language").unwrap();
    assert_eq!(store.get("language").unwrap(), None);
  }
}

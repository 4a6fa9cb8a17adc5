//! Cache storage backends: SQLite for persistence, in-memory for tests
//! and dry runs.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

use super::traits::{CacheStore, Entry};

/// In-memory storage. Used by tests and the `--memory` flag; nothing
/// survives the process.
#[derive(Default)]
pub struct MemoryStore {
  partitions: Mutex<HashMap<String, Vec<Entry>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStore for MemoryStore {
  fn put(&self, partition: &str, entry: &Entry) -> Result<()> {
    let mut partitions = lock(&self.partitions)?;
    let entries = partitions.entry(partition.to_string()).or_default();

    match entries.iter_mut().find(|e| e.url == entry.url) {
      Some(existing) => *existing = entry.clone(),
      None => entries.push(entry.clone()),
    }
    Ok(())
  }

  fn get(&self, partition: &str, url: &str) -> Result<Option<Entry>> {
    let partitions = lock(&self.partitions)?;
    Ok(
      partitions
        .get(partition)
        .and_then(|entries| entries.iter().find(|e| e.url == url))
        .cloned(),
    )
  }

  fn list(&self, partition: &str) -> Result<Vec<Entry>> {
    let partitions = lock(&self.partitions)?;
    Ok(partitions.get(partition).cloned().unwrap_or_default())
  }

  fn delete(&self, partition: &str, url: &str) -> Result<bool> {
    let mut partitions = lock(&self.partitions)?;
    let Some(entries) = partitions.get_mut(partition) else {
      return Ok(false);
    };

    let before = entries.len();
    entries.retain(|e| e.url != url);
    Ok(entries.len() != before)
  }

  fn partitions(&self) -> Result<Vec<String>> {
    let partitions = lock(&self.partitions)?;
    let mut names: Vec<String> = partitions
      .iter()
      .filter(|(_, entries)| !entries.is_empty())
      .map(|(name, _)| name.clone())
      .collect();
    names.sort();
    Ok(names)
  }

  fn drop_partition(&self, partition: &str) -> Result<()> {
    let mut partitions = lock(&self.partitions)?;
    partitions.remove(partition);
    Ok(())
  }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
  mutex.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
}

/// SQLite-based cache storage.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the store at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open an ephemeral in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory cache: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;
    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("liferaft").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = lock(&self.conn)?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the partitioned entry table.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cache_entries (
    partition TEXT NOT NULL,
    url_hash TEXT NOT NULL,
    url TEXT NOT NULL,
    method TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (partition, url_hash)
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_partition
    ON cache_entries(partition);
"#;

/// Stable, fixed-length row key for a URL.
fn url_hash(url: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(url.as_bytes());
  hex::encode(hasher.finalize())
}

impl CacheStore for SqliteStore {
  fn put(&self, partition: &str, entry: &Entry) -> Result<()> {
    let conn = lock(&self.conn)?;
    let data =
      serde_json::to_vec(entry).map_err(|e| eyre!("Failed to serialize cache entry: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache_entries (partition, url_hash, url, method, data, cached_at)
         VALUES (?, ?, ?, ?, ?, datetime('now'))",
        params![
          partition,
          url_hash(&entry.url),
          entry.url,
          entry.method.as_str(),
          data
        ],
      )
      .map_err(|e| eyre!("Failed to store cache entry: {}", e))?;

    Ok(())
  }

  fn get(&self, partition: &str, url: &str) -> Result<Option<Entry>> {
    let conn = lock(&self.conn)?;

    let mut stmt = conn
      .prepare("SELECT data FROM cache_entries WHERE partition = ? AND url_hash = ?")
      .map_err(|e| eyre!("Failed to prepare lookup: {}", e))?;

    let data: Option<Vec<u8>> = stmt
      .query_row(params![partition, url_hash(url)], |row| row.get(0))
      .ok();

    match data {
      Some(data) => {
        let entry: Entry = serde_json::from_slice(&data)
          .map_err(|e| eyre!("Failed to deserialize cache entry: {}", e))?;
        Ok(Some(entry))
      }
      None => Ok(None),
    }
  }

  fn list(&self, partition: &str) -> Result<Vec<Entry>> {
    let conn = lock(&self.conn)?;

    let mut stmt = conn
      .prepare("SELECT data FROM cache_entries WHERE partition = ? ORDER BY rowid")
      .map_err(|e| eyre!("Failed to prepare list query: {}", e))?;

    let entries: Vec<Entry> = stmt
      .query_map(params![partition], |row| {
        let data: Vec<u8> = row.get(0)?;
        Ok(data)
      })
      .map_err(|e| eyre!("Failed to list cache entries: {}", e))?
      .filter_map(|r| r.ok())
      .filter_map(|data| serde_json::from_slice(&data).ok())
      .collect();

    Ok(entries)
  }

  fn delete(&self, partition: &str, url: &str) -> Result<bool> {
    let conn = lock(&self.conn)?;

    let removed = conn
      .execute(
        "DELETE FROM cache_entries WHERE partition = ? AND url_hash = ?",
        params![partition, url_hash(url)],
      )
      .map_err(|e| eyre!("Failed to delete cache entry: {}", e))?;

    Ok(removed > 0)
  }

  fn partitions(&self) -> Result<Vec<String>> {
    let conn = lock(&self.conn)?;

    let mut stmt = conn
      .prepare("SELECT DISTINCT partition FROM cache_entries ORDER BY partition")
      .map_err(|e| eyre!("Failed to prepare partition query: {}", e))?;

    let names: Vec<String> = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list partitions: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(names)
  }

  fn drop_partition(&self, partition: &str) -> Result<()> {
    let conn = lock(&self.conn)?;

    conn
      .execute(
        "DELETE FROM cache_entries WHERE partition = ?",
        params![partition],
      )
      .map_err(|e| eyre!("Failed to drop partition: {}", e))?;

    Ok(())
  }
}

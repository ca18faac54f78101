// Durable key-value slots and the task persistence adapter

use crate::codec;
use crate::config::Backend;
use crate::error::PersistenceError;
use crate::models::{Task, now};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Slot key holding the task collection
pub const TODOS_KEY: &str = "todos";

/// SQLite database file name inside the store directory
pub const DB_FILE: &str = "todostore.db";

/// A durable string-valued key-value slot
pub trait Slot {
    /// Read the value stored under `key`, or `None` if nothing was ever written
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Overwrite the value under `key`; returns once the write is durable
    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

// ============================================================================
// File backend
// ============================================================================

/// One `<key>.json` file per key inside a directory
///
/// Writes go to a temp file that is synced and renamed over the target while
/// holding an exclusive lock on `<key>.lock`.
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn open_lock(&self, key: &str) -> Result<File, PersistenceError> {
        let lock = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.dir.join(format!("{}.lock", key)))?;
        Ok(lock)
    }
}

impl Slot for FileSlot {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        validate_key(key)?;

        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let lock = self.open_lock(key)?;
        FileExt::lock_shared(&lock)?;
        let content = fs::read_to_string(&path)?;

        // Lock is released when `lock` is dropped
        Ok(Some(content))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        validate_key(key)?;

        let lock = self.open_lock(key)?;
        FileExt::lock_exclusive(&lock)?;

        let tmp_path = self.dir.join(format!("{}.json.tmp", key));
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(value.as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, self.path_for(key))?;

        Ok(())
    }
}

// ============================================================================
// SQLite backend
// ============================================================================

/// Key-value slots in a SQLite table
pub struct SqliteSlot {
    db: Connection,
}

impl SqliteSlot {
    /// Open or create `todostore.db` inside `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, PersistenceError> {
        fs::create_dir_all(dir.as_ref())?;
        let db = Connection::open(dir.as_ref().join(DB_FILE))?;
        let slot = Self { db };
        slot.create_schema()?;
        Ok(slot)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let slot = Self {
            db: Connection::open_in_memory()?,
        };
        slot.create_schema()?;
        Ok(slot)
    }

    fn create_schema(&self) -> Result<(), PersistenceError> {
        debug!("Creating slot schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

impl Slot for SqliteSlot {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        validate_key(key)?;

        let value = self
            .db
            .query_row("SELECT value FROM slots WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;

        Ok(value)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        validate_key(key)?;

        self.db.execute(
            "INSERT OR REPLACE INTO slots (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, now().timestamp_millis()],
        )?;

        Ok(())
    }
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local slots; clones share the same entries
#[derive(Debug, Clone, Default)]
pub struct MemorySlot {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
    }
}

impl Slot for MemorySlot {
    fn read(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        validate_key(key)?;
        Ok(self.get(key))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        validate_key(key)?;
        self.insert(key, value);
        Ok(())
    }
}

// ============================================================================
// Persistence adapter
// ============================================================================

/// Loads and saves the task collection through a slot
pub struct Persistence {
    slot: Box<dyn Slot>,
    key: String,
}

impl Persistence {
    /// Bind `slot` under the default `"todos"` key
    pub fn new(slot: impl Slot + 'static) -> Self {
        Self {
            slot: Box::new(slot),
            key: TODOS_KEY.to_string(),
        }
    }

    pub fn with_key(slot: impl Slot + 'static, key: &str) -> Result<Self, PersistenceError> {
        validate_key(key)?;
        Ok(Self {
            slot: Box::new(slot),
            key: key.to_string(),
        })
    }

    /// Open the configured backend rooted at `store_path`
    pub fn open<P: AsRef<Path>>(backend: Backend, store_path: P) -> Result<Self, PersistenceError> {
        let persistence = match backend {
            Backend::File => Self::new(FileSlot::open(store_path)?),
            Backend::Sqlite => Self::new(SqliteSlot::open(store_path)?),
        };
        Ok(persistence)
    }

    pub fn memory() -> Self {
        Self::new(MemorySlot::new())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the saved collection
    ///
    /// Never fails: a missing, unreadable or corrupt payload yields an empty
    /// collection.
    pub fn load(&self) -> Vec<Task> {
        let payload = match self.slot.read(&self.key) {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(key = %self.key, "No saved tasks, starting empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read saved tasks, starting empty");
                return Vec::new();
            }
        };

        match codec::parse(&payload) {
            Ok(tasks) => {
                info!(key = %self.key, count = tasks.len(), "Loaded saved tasks");
                tasks
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "Saved tasks are corrupt, starting empty");
                Vec::new()
            }
        }
    }

    /// Write the full collection, replacing prior contents
    pub fn save<'a, I>(&mut self, tasks: I) -> Result<(), PersistenceError>
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let payload = codec::serialize(tasks)?;
        self.slot.write(&self.key, &payload)?;
        debug!(key = %self.key, bytes = payload.len(), "Saved tasks");
        Ok(())
    }
}

/// Validate a slot key (also used as a file stem)
pub fn validate_key(key: &str) -> Result<(), PersistenceError> {
    if key.is_empty() {
        return Err(PersistenceError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.len() > 64 {
        return Err(PersistenceError::InvalidKey(format!("{} (max 64 chars)", key)));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(PersistenceError::InvalidKey(format!(
            "{} (must be alphanumeric with _/-)",
            key
        )));
    }
    Ok(())
}

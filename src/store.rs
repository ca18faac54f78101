// Task store: owns the canonical collection and persists every change

use crate::codec::{self, Layout};
use crate::error::{ImportError, PersistenceError, TodoError};
use crate::filter::{self, View};
use crate::models::{self, Priority, Task, TaskDraft};
use crate::slot::Persistence;
use crate::stats::{self, Stats};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Canonical task collection
///
/// The store is the sole owner of its tasks. Every committed mutation is
/// followed by a synchronous save; a failed save is reported as
/// `TodoError::Persistence` while the in-memory change stays applied.
pub struct TodoStore {
    tasks: HashMap<String, Task>,
    /// Insertion order of ids
    order: Vec<String>,
    persistence: Persistence,
}

impl TodoStore {
    /// Open a store over `persistence`, loading whatever it holds
    ///
    /// Loading never fails; unreadable or corrupt data starts an empty store.
    pub fn open(persistence: Persistence) -> Self {
        let loaded = persistence.load();
        let mut store = Self {
            tasks: HashMap::new(),
            order: Vec::new(),
            persistence,
        };
        let accepted = store.replace(loaded);
        debug!(count = accepted, "Opened task store");
        store
    }

    /// Open a store backed by a fresh in-memory slot
    pub fn in_memory() -> Self {
        Self::open(Persistence::memory())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Tasks in insertion order
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Look up a task by a unique id prefix (an exact id always wins)
    pub fn find_by_prefix(&self, prefix: &str) -> Result<&Task, TodoError> {
        if let Some(task) = self.tasks.get(prefix) {
            return Ok(task);
        }
        if prefix.is_empty() {
            return Err(TodoError::NotFound(prefix.to_string()));
        }

        let mut matches = self.tasks().filter(|t| t.id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task),
            (Some(_), Some(_)) => Err(TodoError::Ambiguous(prefix.to_string())),
            (None, _) => Err(TodoError::NotFound(prefix.to_string())),
        }
    }

    /// Filtered, searched and sorted view of the current tasks
    pub fn project(&self, view: &View) -> Vec<&Task> {
        filter::project(self.tasks(), view)
    }

    pub fn stats(&self) -> Stats {
        stats::aggregate(self.tasks())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a task from `draft` and return its id
    ///
    /// Blank text is rejected with `EmptyText` without touching state.
    /// High priority marks the task important.
    pub fn add(&mut self, draft: TaskDraft) -> Result<String, TodoError> {
        let text = draft.text.trim();
        if text.is_empty() {
            debug!("Rejected task with blank text");
            return Err(TodoError::EmptyText);
        }

        let mut id = models::new_id();
        while self.tasks.contains_key(&id) {
            id = models::new_id();
        }

        let mut task = Task {
            id: id.clone(),
            text: text.to_string(),
            completed: false,
            important: draft.priority == Priority::High,
            created_at: models::now(),
            completed_at: None,
            due_date: draft.due_date,
            priority: draft.priority,
            category: draft.category,
            description: draft.description,
        };
        task.normalize();

        self.order.push(id.clone());
        self.tasks.insert(id.clone(), task);
        info!(id = %id, "Added task");

        self.persist()?;
        Ok(id)
    }

    /// Replace the stored task with the same id
    ///
    /// Category and description are normalized as in `add`. `created_at` is
    /// kept from the stored record. `completed_at` is
    /// re-derived: stamped now when the task becomes completed, kept while it
    /// stays completed, cleared when it is not completed.
    pub fn update(&mut self, mut record: Task) -> Result<(), TodoError> {
        let text = record.text.trim();
        if text.is_empty() {
            return Err(TodoError::EmptyText);
        }
        record.text = text.to_string();
        record.normalize();

        let existing = self
            .tasks
            .get_mut(&record.id)
            .ok_or_else(|| TodoError::NotFound(record.id.clone()))?;

        record.created_at = existing.created_at;
        record.completed_at = match (record.completed, existing.completed) {
            (true, false) => Some(models::now()),
            (true, true) => existing.completed_at.or_else(|| Some(models::now())),
            (false, _) => None,
        };

        debug!(id = %record.id, "Updated task");
        *existing = record;

        self.persist()?;
        Ok(())
    }

    /// Remove a task; returns whether it existed
    ///
    /// An unknown id is a no-op and is not saved.
    pub fn delete(&mut self, id: &str) -> Result<bool, TodoError> {
        if self.tasks.remove(id).is_none() {
            debug!(id, "Delete of unknown task ignored");
            return Ok(false);
        }
        self.order.retain(|existing| existing != id);
        info!(id, "Deleted task");

        self.persist()?;
        Ok(true)
    }

    /// Flip the important flag; returns the new value
    pub fn toggle_important(&mut self, id: &str) -> Result<bool, TodoError> {
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| TodoError::NotFound(id.to_string()))?;

        task.important = !task.important;
        let important = task.important;
        debug!(id, important, "Toggled important");

        self.persist()?;
        Ok(important)
    }

    /// Flip completion, stamping or clearing `completed_at`; returns the new value
    pub fn toggle_completed(&mut self, id: &str) -> Result<bool, TodoError> {
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| TodoError::NotFound(id.to_string()))?;

        task.completed = !task.completed;
        task.completed_at = task.completed.then(models::now);
        let completed = task.completed;
        debug!(id, completed, "Toggled completed");

        self.persist()?;
        Ok(completed)
    }

    /// Replace the whole collection; returns how many records were kept
    ///
    /// Records with a blank id or blank text, and repeats of an id already
    /// seen, are dropped with a warning instead of failing the call.
    pub fn set_all(&mut self, records: Vec<Task>) -> Result<usize, TodoError> {
        let accepted = self.replace(records);
        info!(count = accepted, "Replaced all tasks");

        self.persist()?;
        Ok(accepted)
    }

    /// Remove every task
    pub fn clear(&mut self) -> Result<(), TodoError> {
        self.set_all(Vec::new())?;
        Ok(())
    }

    // ========================================================================
    // Import / export
    // ========================================================================

    /// Replace the collection with a serialized payload
    ///
    /// On a parse error nothing changes.
    pub fn import_str(&mut self, text: &str) -> Result<usize, TodoError> {
        let records = codec::parse(text)?;
        self.set_all(records)
    }

    /// Read a file and import it; on any error nothing changes
    pub fn import_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, TodoError> {
        let text = fs::read_to_string(path.as_ref()).map_err(ImportError::from)?;
        let count = self.import_str(&text)?;
        info!(path = ?path.as_ref(), count, "Imported tasks");
        Ok(count)
    }

    /// Serialize the collection in insertion order
    pub fn export(&self) -> Result<String, PersistenceError> {
        self.export_as(Layout::Versioned)
    }

    pub fn export_as(&self, layout: Layout) -> Result<String, PersistenceError> {
        Ok(codec::serialize_as(self.tasks(), layout)?)
    }

    /// Write the collection to `path` in `layout`
    pub fn export_file<P: AsRef<Path>>(&self, path: P, layout: Layout) -> Result<(), PersistenceError> {
        let payload = self.export_as(layout)?;
        fs::write(path.as_ref(), payload)?;
        info!(path = ?path.as_ref(), %layout, count = self.len(), "Exported tasks");
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn replace(&mut self, records: Vec<Task>) -> usize {
        let mut tasks = HashMap::with_capacity(records.len());
        let mut order = Vec::with_capacity(records.len());
        let mut seen = HashSet::with_capacity(records.len());
        let at = models::now();

        for (index, mut record) in records.into_iter().enumerate() {
            if record.id.trim().is_empty() || record.text.trim().is_empty() {
                warn!(index, "Dropping task with blank id or text");
                continue;
            }
            if !seen.insert(record.id.clone()) {
                warn!(index, id = %record.id, "Dropping task with duplicate id");
                continue;
            }
            record.normalize();
            record.reconcile_completion(at);
            order.push(record.id.clone());
            tasks.insert(record.id.clone(), record);
        }

        self.tasks = tasks;
        self.order = order;
        self.order.len()
    }

    fn persist(&mut self) -> Result<(), TodoError> {
        let tasks = &self.tasks;
        self.persistence
            .save(self.order.iter().filter_map(|id| tasks.get(id)))
            .map_err(|e| {
                warn!(error = %e, "Failed to save tasks");
                TodoError::Persistence(e)
            })
    }
}

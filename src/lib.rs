// TodoStore - Personal task list with durable local persistence

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod slot;
pub mod stats;
pub mod store;

// Re-export main types for convenience
pub use error::{ImportError, PersistenceError, TodoError};
pub use filter::{SortKey, StatusFilter, View, project};
pub use codec::Layout;
pub use models::{Category, Priority, Task, TaskDraft, now};
pub use slot::{FileSlot, MemorySlot, Persistence, Slot, SqliteSlot};
pub use stats::{Stats, aggregate};
pub use store::TodoStore;

// Adapters behind the application ports

pub mod fs_object_store;
pub mod in_memory_history;
pub mod sqlite_history;
pub mod unavailable_history;

pub use fs_object_store::FsObjectStore;
pub use in_memory_history::InMemoryHistoryStore;
pub use sqlite_history::SqliteHistoryStore;
pub use unavailable_history::{open_history_store, UnavailableHistoryStore};

//! Store implementations. `SqliteStore` is the production backend;
//! `MemoryStore` backs tests across the workspace.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

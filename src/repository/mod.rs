//! Repository Layer
//!
//! Local persistence: SQLite slot table plus the replica that reads and
//! writes whole collections through it.

mod db;
mod replica;
mod traits;


pub use db::{init_db, DbState, SqliteStore};
pub use replica::{LocalReplica, MemoryStore, ITEMS_SLOT, TOMBSTONES_SLOT};
pub use traits::KeyValueStore;

//! Repository Layer - Core Traits
//!
//! The local replica is a durable key-value store holding whole-document
//! slots. Implementations can use SQLite, in-memory maps, etc.

use async_trait::async_trait;

use crate::domain::DomainResult;

/// Named-slot storage scoped to the application
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a slot; `None` when it was never written
    async fn read_slot(&self, key: &str) -> DomainResult<Option<String>>;

    /// Overwrite every given slot in one atomic step
    async fn write_slots(&self, entries: &[(&str, String)]) -> DomainResult<()>;
}

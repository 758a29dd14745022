//! Remote Gateway - Core Traits
//!
//! The remote replica is reachable only through list/upsert/delete calls
//! that may fail, be dropped or be applied out of order.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Collection, DomainResult, Item, ItemId};

/// Whether the remote is expected to already hold the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteIntent {
    Insert,
    Update,
}

impl WriteIntent {
    /// `action` query value understood by the endpoint
    pub fn action(&self) -> &'static str {
        match self {
            WriteIntent::Insert => "add",
            WriteIntent::Update => "update",
        }
    }
}

#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Full remote snapshot; `RemoteUnavailable` on network or parse errors
    async fn list_all(&self) -> DomainResult<Collection>;

    async fn upsert(&self, item: &Item, intent: WriteIntent) -> DomainResult<()>;

    async fn delete(&self, id: &ItemId) -> DomainResult<()>;
}

/// One propagation to the remote replica
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Upsert { item: Item, intent: WriteIntent },
    Delete { id: ItemId },
}

impl RemoteCall {
    pub fn insert(item: Item) -> Self {
        RemoteCall::Upsert {
            item,
            intent: WriteIntent::Insert,
        }
    }

    pub fn update(item: Item) -> Self {
        RemoteCall::Upsert {
            item,
            intent: WriteIntent::Update,
        }
    }

    pub fn delete(id: ItemId) -> Self {
        RemoteCall::Delete { id }
    }

    pub async fn send(&self, gateway: &dyn RemoteGateway) -> DomainResult<()> {
        match self {
            RemoteCall::Upsert { item, intent } => gateway.upsert(item, *intent).await,
            RemoteCall::Delete { id } => gateway.delete(id).await,
        }
    }
}

impl fmt::Display for RemoteCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteCall::Upsert { item, intent } => write!(f, "{} {}", intent.action(), item.id),
            RemoteCall::Delete { id } => write!(f, "delete {}", id),
        }
    }
}

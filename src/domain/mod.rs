//! Domain Layer
//!
//! Item entity, collection, tombstones, clock and errors.
//! No storage or network code lives here.

mod clock;
mod collection;
mod error;
mod item;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collection::{Collection, Tombstone, Tombstones};
pub use error::{DomainError, DomainResult};
pub use item::{Item, ItemDraft, ItemEdit, ItemId, Timestamp};

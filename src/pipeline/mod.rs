//! Pipeline Layer
//!
//! Local-first mutations over the shared collection.

mod bucket_list;
mod state;

pub use bucket_list::BucketList;
pub use state::{CollectionEvent, LocalState, ReplaceReason};

pub(crate) use state::SharedState;

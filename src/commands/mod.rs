//! Commands Layer
//!
//! Handlers the UI binds to. Each one works on `AppState` and reports
//! failures as display strings.

mod backup_cmd;
mod item_cmd;
mod sync_cmd;

pub use backup_cmd::*;
pub use item_cmd::*;
pub use sync_cmd::*;

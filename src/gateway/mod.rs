//! Gateway Layer
//!
//! Access to the remote replica: the abstract capability, an HTTP
//! implementation, in-process remotes and the fire-and-forget dispatcher.

mod dispatch;
mod http;
mod memory;
mod traits;

pub use dispatch::{DispatchHandle, Dispatcher};
pub use http::{parse_endpoint, HttpGateway, DEFAULT_TIMEOUT};
pub use memory::{MemoryRemote, OfflineGateway};
pub use traits::{RemoteCall, RemoteGateway, WriteIntent};

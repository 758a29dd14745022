//! Fire-and-forget propagation
//!
//! Each submitted call runs on its own task. Failures are logged and
//! dropped: no retry, no ordering between calls, nothing reaches the caller
//! unless it chooses to wait on the returned handle.

use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::traits::{RemoteCall, RemoteGateway};

/// Completion of one submitted call; dropping it is fine
pub struct DispatchHandle {
    outcome: oneshot::Receiver<bool>,
}

impl DispatchHandle {
    /// `true` if the remote accepted the call
    pub async fn succeeded(self) -> bool {
        self.outcome.await.unwrap_or(false)
    }
}

pub struct Dispatcher {
    gateway: RwLock<Arc<dyn RemoteGateway>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        Self {
            gateway: RwLock::new(gateway),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub fn gateway(&self) -> Arc<dyn RemoteGateway> {
        match self.gateway.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Point later calls at another remote
    pub fn set_gateway(&self, gateway: Arc<dyn RemoteGateway>) {
        match self.gateway.write() {
            Ok(mut guard) => *guard = gateway,
            Err(poisoned) => *poisoned.into_inner() = gateway,
        }
    }

    /// Start the call in the background and return immediately
    pub fn submit(&self, call: RemoteCall) -> DispatchHandle {
        let (tx, rx) = oneshot::channel();
        let gateway = self.gateway();

        let task = tokio::spawn(async move {
            let ok = match call.send(gateway.as_ref()).await {
                Ok(()) => {
                    log::debug!("Remote {} ok", call);
                    true
                }
                Err(e) => {
                    log::warn!("Remote {} failed: {}", call, e);
                    false
                }
            };
            let _ = tx.send(ok);
        });

        let mut in_flight = self.in_flight();
        in_flight.retain(|t| !t.is_finished());
        in_flight.push(task);

        DispatchHandle { outcome: rx }
    }

    pub fn submit_all(&self, calls: impl IntoIterator<Item = RemoteCall>) -> Vec<DispatchHandle> {
        calls.into_iter().map(|call| self.submit(call)).collect()
    }

    /// Calls submitted but not yet finished
    pub fn pending(&self) -> usize {
        self.in_flight().iter().filter(|t| !t.is_finished()).count()
    }

    /// Wait until every call submitted so far has finished
    pub async fn flush(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.in_flight());
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                let _ = task.await;
            }
        }
    }

    fn in_flight(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

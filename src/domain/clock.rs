//! Time source for `updated_at` / `completed_at`

use std::sync::atomic::{AtomicI64, Ordering};

use super::item::Timestamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock in epoch milliseconds, strictly increasing within a process
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = chrono::Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::SeqCst);
        loop {
            let next = wall.max(prev + 1);
            match self
                .last
                .compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return Timestamp(next),
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Deterministic clock: every read returns the current value, then advances by one
#[derive(Debug)]
pub struct ManualClock {
    next: AtomicI64,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }

    pub fn set(&self, millis: i64) {
        self.next.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.next.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

// Monotonic connection id counter: replaces the teacher's session-id
// generator now that there is no control-server session concept to track,
// just a number for logging and source bookkeeping.

use std::sync::atomic::{AtomicU64, Ordering};

pub struct ConnectionIdGenerator {
    next: AtomicU64,
}

impl ConnectionIdGenerator {
    pub fn new() -> ConnectionIdGenerator {
        ConnectionIdGenerator { next: AtomicU64::new(1) }
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for ConnectionIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

//! Wakers for observing bridge signals in tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use wireterm_io::{EventWaker, HandleId};

/// Discards every wake. For tests that drain manually.
#[derive(Debug, Default)]
pub struct NullWaker;

impl EventWaker for NullWaker {
    fn wake(&self, _handle: HandleId) {}
}

/// Counts wakes and remembers which handles they were for.
#[derive(Debug, Default)]
pub struct CountingWaker {
    count: AtomicUsize,
    handles: Mutex<Vec<HandleId>>,
}

impl CountingWaker {
    /// A waker with zero recorded wakes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of wakes so far.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Handles woken, in order.
    pub fn handles(&self) -> Vec<HandleId> {
        self.handles.lock().clone()
    }
}

impl EventWaker for CountingWaker {
    fn wake(&self, handle: HandleId) {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.handles.lock().push(handle);
    }
}

//! Driver-thread to main-thread event bridge.
//!
//! Drivers run arbitrary worker threads, but every connection-layer
//! callback must execute on the application's main thread. The bridge is
//! the only cross-thread boundary in the subsystem: a driver thread calls
//! [`EventPoster::post`], which queues the event under the handle's mutex
//! and wakes the main thread; the main thread later drains the queue via
//! [`crate::IoSystem::dispatch_events`].
//!
//! `BytesAvailable` is special-cased: bursts of it collapse into a single
//! pending flag, so a fast producer costs one wakeup, not thousands. Every
//! other code is delivered in FIFO post order.

use std::sync::Arc;

use parking_lot::Mutex;

/// Number of non-coalesced events a handle can hold before new ones are
/// dropped. Back-pressure is the driver's problem, not the bridge's.
pub const EVENT_QUEUE_DEPTH: usize = 30;

/// Identifier for a live connection handle.
///
/// IDs are never reused within a process, so a stale ID held after
/// [`crate::IoSystem::free_handle`] can only miss, never alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub(crate) u64);

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handle#{}", self.0)
    }
}

/// Event codes a driver can post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataEvent {
    /// Bytes are ready to read. Coalesced: any number of posts collapse
    /// into one pending notification until the main thread drains.
    BytesAvailable,

    /// The transport finished connecting.
    Connected,

    /// The transport lost its connection.
    Disconnected,
}

/// Wakes the application thread after an event was posted.
///
/// Implementations must be cheap and non-blocking; `wake` runs on driver
/// threads while no bridge lock is held.
pub trait EventWaker: Send + Sync {
    /// Request that the main thread call
    /// [`crate::IoSystem::dispatch_events`] for `handle`.
    fn wake(&self, handle: HandleId);
}

/// The usual waker: push the handle ID onto the main thread's event
/// channel. Send failures mean the application is shutting down and are
/// ignored.
impl EventWaker for tokio::sync::mpsc::UnboundedSender<HandleId> {
    fn wake(&self, handle: HandleId) {
        let _ = self.send(handle);
    }
}

/// What [`EventQueue::take_next`] pulled off on one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Drained {
    /// The coalesced bytes-available flag, snapshotted and cleared.
    pub data_available: bool,
    /// One queued code, if any.
    pub code: Option<DataEvent>,
}

impl Drained {
    /// True when the pass found nothing; the drain loop stops here.
    pub fn is_empty(&self) -> bool {
        !self.data_available && self.code.is_none()
    }
}

#[derive(Debug, Default)]
struct QueueState {
    ring: std::collections::VecDeque<DataEvent>,
    data_available: bool,
    shut_down: bool,
}

/// Per-handle bounded event queue plus the coalesced data-available flag.
///
/// The mutex is held only for O(1) flag/ring operations, never across a
/// driver callback or I/O.
#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    state: Mutex<QueueState>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event. Returns true when the main thread should be woken.
    ///
    /// Callable from any thread. After [`EventQueue::shut_down`] this is a
    /// silent no-op.
    pub fn post(&self, code: DataEvent) -> bool {
        let mut state = self.state.lock();
        if state.shut_down {
            return false;
        }

        if code == DataEvent::BytesAvailable {
            // Coalesce: only the first post since the last drain signals.
            let was_pending = state.data_available;
            state.data_available = true;
            return !was_pending;
        }

        if state.ring.len() >= EVENT_QUEUE_DEPTH {
            drop(state);
            tracing::debug!(?code, "event queue full, dropping event");
            if code == DataEvent::Disconnected {
                // A lost Disconnected can strand the connection layer in an
                // apparently-open state; make that visible.
                tracing::warn!("dropped Disconnected event on full queue");
            }
            return false;
        }

        state.ring.push_back(code);
        true
    }

    /// Snapshot-and-clear the data-available flag and pop one queued code.
    ///
    /// Main thread only.
    pub fn take_next(&self) -> Drained {
        let mut state = self.state.lock();
        let data_available = state.data_available;
        state.data_available = false;
        let code = state.ring.pop_front();
        Drained { data_available, code }
    }

    /// Tear the queue down: pending events are discarded and all further
    /// posts become no-ops. Called while the handle is being freed.
    pub fn shut_down(&self) {
        let mut state = self.state.lock();
        state.shut_down = true;
        state.data_available = false;
        state.ring.clear();
    }
}

/// A connection's channel back into the application.
///
/// Handed to the driver at allocation time; cloneable into any worker
/// thread. Posting after the handle was freed is safe and does nothing.
#[derive(Clone)]
pub struct EventPoster {
    handle: HandleId,
    queue: Arc<EventQueue>,
    waker: Arc<dyn EventWaker>,
}

impl std::fmt::Debug for EventPoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPoster").field("handle", &self.handle).finish_non_exhaustive()
    }
}

impl EventPoster {
    pub(crate) fn new(handle: HandleId, queue: Arc<EventQueue>, waker: Arc<dyn EventWaker>) -> Self {
        Self { handle, queue, waker }
    }

    /// The handle this poster feeds.
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Post an event from any thread.
    pub fn post(&self, code: DataEvent) {
        if self.queue.post(code) {
            self.waker.wake(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingWaker(AtomicUsize);

    impl EventWaker for CountingWaker {
        fn wake(&self, _handle: HandleId) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn poster_with_counter() -> (EventPoster, Arc<EventQueue>, Arc<CountingWaker>) {
        let queue = Arc::new(EventQueue::new());
        let waker = Arc::new(CountingWaker::default());
        let poster = EventPoster::new(HandleId(1), Arc::clone(&queue), waker.clone());
        (poster, queue, waker)
    }

    #[test]
    fn bytes_available_coalesces_to_one_wake() {
        let (poster, queue, waker) = poster_with_counter();

        for _ in 0..100 {
            poster.post(DataEvent::BytesAvailable);
        }

        assert_eq!(waker.0.load(Ordering::SeqCst), 1);
        let drained = queue.take_next();
        assert!(drained.data_available);
        assert_eq!(drained.code, None);
        // Re-armed after the drain
        poster.post(DataEvent::BytesAvailable);
        assert_eq!(waker.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn other_codes_keep_fifo_order() {
        let (poster, queue, _waker) = poster_with_counter();

        poster.post(DataEvent::Connected);
        poster.post(DataEvent::Disconnected);

        assert_eq!(queue.take_next().code, Some(DataEvent::Connected));
        assert_eq!(queue.take_next().code, Some(DataEvent::Disconnected));
        assert!(queue.take_next().is_empty());
    }

    #[test]
    fn overflow_drops_silently() {
        let (poster, queue, waker) = poster_with_counter();

        for _ in 0..(EVENT_QUEUE_DEPTH + 10) {
            poster.post(DataEvent::Connected);
        }

        assert_eq!(waker.0.load(Ordering::SeqCst), EVENT_QUEUE_DEPTH);
        let mut drained = 0;
        while queue.take_next().code.is_some() {
            drained += 1;
        }
        assert_eq!(drained, EVENT_QUEUE_DEPTH);
    }

    #[test]
    fn post_after_shutdown_is_noop() {
        let (poster, queue, waker) = poster_with_counter();

        queue.shut_down();
        poster.post(DataEvent::BytesAvailable);
        poster.post(DataEvent::Disconnected);

        assert_eq!(waker.0.load(Ordering::SeqCst), 0);
        assert!(queue.take_next().is_empty());
    }

    #[test]
    fn tokio_sender_is_a_waker() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let waker: Arc<dyn EventWaker> = Arc::new(tx);
        waker.wake(HandleId(7));
        assert_eq!(rx.try_recv().ok(), Some(HandleId(7)));
    }
}

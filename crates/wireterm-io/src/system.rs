//! Handle manager: live connections over any registered transport.
//!
//! [`IoSystem`] turns a combined unique ID (or URI) into a live
//! [`HandleId`], and routes open/close/read/write through the owning
//! driver without the caller knowing the transport. It also owns the
//! active-handle set — the sole source of truth for "is this handle still
//! valid" when draining queued driver events, because events may arrive
//! after a handle was already freed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::bridge::{DataEvent, EventPoster, EventQueue, EventWaker, HandleId};
use crate::driver::DriverConnection;
use crate::error::{HandleError, TransferError};
use crate::options::OptionList;
use crate::registry::DriverRegistry;
use crate::unique_id;

/// Connection-layer callbacks, executed on the application thread during
/// [`IoSystem::dispatch_events`].
///
/// Each callback receives the subsystem back so it can read, write or
/// even free the handle mid-dispatch; `tag` is the caller-supplied value
/// from allocation.
pub trait ConnectionSink {
    /// Bytes are ready on the connection tagged `tag`.
    ///
    /// Return true to be re-entered later: the subsystem re-posts one
    /// bytes-available event instead of looping, so one chatty connection
    /// cannot starve the rest of the application.
    fn data_available(&mut self, io: &mut IoSystem, tag: u64) -> bool;

    /// The connection tagged `tag` finished connecting.
    fn connected(&mut self, io: &mut IoSystem, tag: u64);

    /// The connection tagged `tag` disconnected.
    fn disconnected(&mut self, io: &mut IoSystem, tag: u64);
}

struct HandleEntry {
    combined_id: String,
    user_tag: u64,
    options: OptionList,
    open: bool,
    conn: Box<dyn DriverConnection>,
    queue: Arc<EventQueue>,
    poster: EventPoster,
}

/// The handle manager.
///
/// Owns the [`DriverRegistry`] and the active-handle set. Apart from
/// driver-thread event posting (see [`crate::EventPoster`]), every method
/// here is main-thread-only; there is no internal locking.
pub struct IoSystem {
    registry: DriverRegistry,
    waker: Arc<dyn EventWaker>,
    handles: HashMap<HandleId, HandleEntry>,
    next_handle: u64,
}

impl IoSystem {
    /// Build the subsystem around an already-populated registry.
    ///
    /// `waker` is how the bridge nudges the main thread; pass the send
    /// half of the application's event channel.
    pub fn new(registry: DriverRegistry, waker: Arc<dyn EventWaker>) -> Self {
        Self { registry, waker, handles: HashMap::new(), next_handle: 1 }
    }

    /// The registry, for discovery and URI lookups.
    pub fn registry(&self) -> &DriverRegistry {
        &self.registry
    }

    /// Mutable registry access (rescans, point lookups).
    pub fn registry_mut(&mut self) -> &mut DriverRegistry {
        &mut self.registry
    }

    /// Allocate a handle for the connection identified by `combined_id`.
    ///
    /// `user_tag` is an opaque value handed back through every
    /// [`ConnectionSink`] callback. The handle starts closed.
    ///
    /// Failure at any step rolls back everything already built and makes
    /// zero further driver calls — never a half-built handle.
    ///
    /// # Errors
    ///
    /// Lookup errors for the ID, or [`HandleError::AllocateFailed`] from
    /// the driver.
    pub fn alloc_handle(&mut self, combined_id: &str, user_tag: u64) -> Result<HandleId, HandleError> {
        let (driver_name, device_id) = unique_id::split(combined_id)?;
        let drv = self.registry.driver_by_name_mut(&driver_name)?;

        let id = HandleId(self.next_handle);
        let queue = Arc::new(EventQueue::new());
        let poster = EventPoster::new(id, Arc::clone(&queue), Arc::clone(&self.waker));

        // The driver gets its own poster clone; if allocate fails, the
        // queue and poster drop here and nothing was published.
        let conn = drv.driver.allocate(&device_id, poster.clone())?;

        self.next_handle += 1;
        self.handles.insert(
            id,
            HandleEntry {
                combined_id: combined_id.to_string(),
                user_tag,
                options: OptionList::new(),
                open: false,
                conn,
                queue,
                poster,
            },
        );
        Ok(id)
    }

    /// Allocate a handle straight from a URI, applying the options the
    /// URI encodes.
    ///
    /// # Errors
    ///
    /// URI lookup/conversion errors, or any [`IoSystem::alloc_handle`]
    /// failure. The handle is fully rolled back if applying options
    /// fails.
    pub fn alloc_handle_from_uri(&mut self, uri: &str, user_tag: u64) -> Result<HandleId, HandleError> {
        let (combined_id, options) = self.registry.parse_uri(uri)?;
        let id = self.alloc_handle(&combined_id, user_tag)?;
        if let Err(err) = self.set_options(id, options) {
            self.free_handle(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Free a handle: closes it if still open, removes it from the
    /// active-handle set, tears down its event queue and drops the
    /// driver-private state.
    ///
    /// Freeing an already-freed handle is a no-op. Events posted for this
    /// handle after (or just before) the free are silently discarded.
    pub fn free_handle(&mut self, handle: HandleId) {
        let Some(mut entry) = self.handles.remove(&handle) else {
            return;
        };
        if entry.open {
            entry.conn.close();
            entry.open = false;
        }
        // Queue is torn down only after the handle left the active set,
        // so a racing post sees either a live queue or a shut-down one.
        entry.queue.shut_down();
    }

    /// Open the connection using its stored options.
    ///
    /// # Errors
    ///
    /// [`HandleError::NotActive`] for a freed handle,
    /// [`HandleError::OpenFailed`] when the driver refuses.
    pub fn open(&mut self, handle: HandleId) -> Result<(), HandleError> {
        let entry = self.handles.get_mut(&handle).ok_or(HandleError::NotActive)?;
        entry.conn.open(&entry.options).map_err(HandleError::OpenFailed)?;
        entry.open = true;
        Ok(())
    }

    /// Close the connection. No-op when already closed or freed.
    pub fn close(&mut self, handle: HandleId) {
        if let Some(entry) = self.handles.get_mut(&handle)
            && entry.open
        {
            entry.conn.close();
            entry.open = false;
        }
    }

    /// Non-blocking read.
    ///
    /// Returns `Ok(0)` when no bytes are available, and also on a closed
    /// or freed handle without calling into the driver.
    ///
    /// # Errors
    ///
    /// [`TransferError`] as mapped from the driver.
    pub fn read(&mut self, handle: HandleId, buf: &mut [u8]) -> Result<usize, TransferError> {
        match self.handles.get_mut(&handle) {
            Some(entry) if entry.open => entry.conn.read(buf),
            _ => Ok(0),
        }
    }

    /// Non-blocking write.
    ///
    /// # Errors
    ///
    /// [`TransferError::Disconnected`] on a closed or freed handle
    /// without calling into the driver; otherwise the driver's mapped
    /// result.
    pub fn write(&mut self, handle: HandleId, data: &[u8]) -> Result<(), TransferError> {
        match self.handles.get_mut(&handle) {
            Some(entry) if entry.open => entry.conn.write(data),
            _ => Err(TransferError::Disconnected),
        }
    }

    /// Flush queued outgoing data on block-device transports.
    ///
    /// Success on drivers without the transmit capability.
    ///
    /// # Errors
    ///
    /// Same contract as [`IoSystem::write`].
    pub fn transmit_queued(&mut self, handle: HandleId) -> Result<(), TransferError> {
        match self.handles.get_mut(&handle) {
            Some(entry) if entry.open => {
                if entry.conn.supports_transmit() {
                    entry.conn.transmit()
                } else {
                    Ok(())
                }
            },
            _ => Err(TransferError::Disconnected),
        }
    }

    /// Replace the connection's option snapshot.
    ///
    /// On an open connection with the change-options capability the new
    /// options are re-applied live; on a closed one they simply take
    /// effect at the next [`IoSystem::open`].
    ///
    /// # Errors
    ///
    /// [`HandleError::NotActive`] or [`HandleError::OptionsRejected`].
    /// The snapshot is updated even when the live re-apply fails.
    pub fn set_options(&mut self, handle: HandleId, options: OptionList) -> Result<(), HandleError> {
        let entry = self.handles.get_mut(&handle).ok_or(HandleError::NotActive)?;
        entry.options = options;
        if entry.open && entry.conn.supports_change_options() {
            entry
                .conn
                .change_options(&entry.options)
                .map_err(HandleError::OptionsRejected)?;
        }
        Ok(())
    }

    /// The connection's current option snapshot.
    pub fn options(&self, handle: HandleId) -> Option<&OptionList> {
        self.handles.get(&handle).map(|entry| &entry.options)
    }

    /// The combined unique ID this handle was allocated from.
    pub fn unique_id(&self, handle: HandleId) -> Option<&str> {
        self.handles.get(&handle).map(|entry| entry.combined_id.as_str())
    }

    /// The caller-supplied tag for this handle.
    pub fn user_tag(&self, handle: HandleId) -> Option<u64> {
        self.handles.get(&handle).map(|entry| entry.user_tag)
    }

    /// Whether the handle exists and is open.
    pub fn is_open(&self, handle: HandleId) -> bool {
        self.handles.get(&handle).is_some_and(|entry| entry.open)
    }

    /// Rebuild the URI for this handle from its device ID and current
    /// options.
    ///
    /// # Errors
    ///
    /// [`HandleError::NotActive`] or the driver's conversion failure.
    pub fn device_uri(&self, handle: HandleId) -> Result<String, HandleError> {
        let entry = self.handles.get(&handle).ok_or(HandleError::NotActive)?;
        self.registry.uri_from_unique_id(&entry.combined_id, &entry.options)
    }

    /// The driver's diagnostic for the most recent failure on this
    /// handle, if it keeps one.
    pub fn last_error_message(&self, handle: HandleId) -> Option<String> {
        self.handles.get(&handle)?.conn.last_error_message()
    }

    /// Drain and dispatch every event queued for `handle`.
    ///
    /// Main thread only; call once per wake-up delivered through the
    /// [`EventWaker`]. A handle that was freed after its wake-up was
    /// posted is silently skipped — that is the active-handle-set guard.
    ///
    /// Per pass this snapshots-and-clears the coalesced data-available
    /// flag and pops one queued code; it stops when a pass finds both
    /// empty. If the sink asked to be re-entered, one fresh
    /// bytes-available event is posted instead of looping here.
    pub fn dispatch_events(&mut self, handle: HandleId, sink: &mut dyn ConnectionSink) {
        let Some(entry) = self.handles.get(&handle) else {
            tracing::debug!(%handle, "event for freed handle, dropping");
            return;
        };
        let queue = Arc::clone(&entry.queue);
        let poster = entry.poster.clone();
        let tag = entry.user_tag;

        let mut reenter = false;
        loop {
            let drained = queue.take_next();
            if drained.is_empty() {
                break;
            }

            // Queued codes go out before the coalesced flag so a
            // Connected posted ahead of the first bytes is seen first.
            match drained.code {
                Some(DataEvent::Connected) => sink.connected(self, tag),
                Some(DataEvent::Disconnected) => sink.disconnected(self, tag),
                // BytesAvailable rides the coalesced flag, never the ring
                Some(DataEvent::BytesAvailable) | None => {},
            }
            if drained.data_available && sink.data_available(self, tag) {
                reenter = true;
            }
        }

        if reenter {
            // Re-arm rather than recurse: the wake lands after the rest of
            // the application's queue has had a turn.
            poster.post(DataEvent::BytesAvailable);
        }
    }
}

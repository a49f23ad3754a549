//! Recording connection sink.

use wireterm_io::{ConnectionSink, IoSystem};

/// One dispatched connection-layer callback, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkEvent {
    /// `data_available` fired for this tag.
    DataAvailable(u64),
    /// `connected` fired for this tag.
    Connected(u64),
    /// `disconnected` fired for this tag.
    Disconnected(u64),
}

/// A [`ConnectionSink`] that records every dispatch.
///
/// `reenter_budget` scripts the data-available return value: while
/// positive, the sink claims more data remained (requesting re-entry) and
/// decrements.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Every dispatched event, in order.
    pub events: Vec<SinkEvent>,
    /// Remaining number of `data_available` calls that request re-entry.
    pub reenter_budget: usize,
}

impl RecordingSink {
    /// An empty sink that never requests re-entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of data-available dispatches recorded so far.
    pub fn data_available_count(&self) -> usize {
        self.events
            .iter()
            .filter(|ev| matches!(ev, SinkEvent::DataAvailable(_)))
            .count()
    }
}

impl ConnectionSink for RecordingSink {
    fn data_available(&mut self, _io: &mut IoSystem, tag: u64) -> bool {
        self.events.push(SinkEvent::DataAvailable(tag));
        if self.reenter_budget > 0 {
            self.reenter_budget -= 1;
            true
        } else {
            false
        }
    }

    fn connected(&mut self, _io: &mut IoSystem, tag: u64) {
        self.events.push(SinkEvent::Connected(tag));
    }

    fn disconnected(&mut self, _io: &mut IoSystem, tag: u64) {
        self.events.push(SinkEvent::Disconnected(tag));
    }
}

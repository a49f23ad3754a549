//! Test harness for the wireterm I/O subsystem.
//!
//! A scriptable [`FakeDriver`] that stands in for a real transport
//! plugin, plus a [`RecordingSink`] that captures dispatched connection
//! events in order and wakers for observing the bridge. The fakes record
//! every driver call so tests can assert exactly what the subsystem did.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod fake_driver;
mod sink;
mod waker;

pub use fake_driver::{DriverLog, FakeDevice, FakeDriver};
pub use sink::{RecordingSink, SinkEvent};
pub use waker::{CountingWaker, NullWaker};

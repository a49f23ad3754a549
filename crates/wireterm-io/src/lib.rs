//! I/O driver abstraction and event bridge for wireterm.
//!
//! Heterogeneous transport plugins (serial ports, TCP/UDP clients and
//! servers, future transports) register under one uniform connection API.
//! The rest of the application opens, reads, writes and closes any of them
//! without knowing the transport, and driver worker threads hand their
//! "data ready / connected / disconnected" notifications safely to the
//! application thread.
//!
//! # Components
//!
//! - [`DriverRegistry`]: registered transports plus connection discovery
//! - [`IoSystem`]: handle allocation, I/O pass-through, event dispatch
//! - [`EventPoster`]: a driver thread's channel back into the application
//! - [`unique_id`]: the escaped `driver-deviceid` token and URI helpers
//!
//! # Threading model
//!
//! Everything runs on the application's main thread except
//! [`EventPoster::post`], which any driver thread may call. Each handle
//! carries a mutex-guarded bounded queue with a coalesced bytes-available
//! flag; the main thread drains it once per wake-up through
//! [`IoSystem::dispatch_events`]. The active-handle set guards against
//! events that outlive their handle.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod bridge;
mod driver;
mod error;
mod natsort;
mod options;
mod registry;
mod system;
pub mod unique_id;

pub use bridge::{DataEvent, EVENT_QUEUE_DEPTH, EventPoster, EventWaker, HandleId};
pub use driver::{DetectedDevice, DriverConnection, DriverInfo, DriverSummary, IoDriver};
pub use error::{DriverError, HandleError, RegistryError, TransferError};
pub use natsort::compare as natural_compare;
pub use options::OptionList;
pub use registry::{ConnectionDescriptor, DriverRegistry, MAX_DEVICES_PER_SCAN};
pub use system::{ConnectionSink, IoSystem};

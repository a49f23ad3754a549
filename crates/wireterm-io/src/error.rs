//! Error types for the I/O subsystem.
//!
//! Strongly-typed errors per layer: registration errors (malformed driver
//! names), handle errors (unknown drivers, bad unique IDs, failed
//! allocation) and transfer errors (the mapped driver I/O result codes).
//!
//! Internal helper failures (ID splitting, URI parsing) never escape as
//! panics; every public entry point converts them into one of these types
//! or a `None`.

use thiserror::Error;

/// Errors raised while registering a driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Driver name contains a character outside `[A-Za-z0-9]`
    #[error("invalid driver name {name:?}: only ASCII letters and digits are allowed")]
    InvalidDriverName {
        /// The rejected name
        name: String,
    },

    /// URI prefix contains a character outside `[A-Za-z]`
    #[error("invalid URI prefix {prefix:?}: only ASCII letters are allowed")]
    InvalidUriPrefix {
        /// The rejected prefix
        prefix: String,
    },

    /// Driver name or prefix is empty
    #[error("driver name and URI prefix must be non-empty")]
    Empty,
}

/// Errors raised by handle allocation and lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// Combined unique ID has no `-` separator
    #[error("malformed unique ID {0:?}: missing driver separator")]
    MalformedId(String),

    /// No registered driver carries this name
    #[error("unknown driver {0:?}")]
    UnknownDriver(String),

    /// No registered driver claims this URI prefix
    #[error("no driver registered for URI prefix {0:?}")]
    UnknownUriPrefix(String),

    /// The driver rejected the URI or options during conversion
    #[error("driver could not convert URI {0:?}")]
    UriConversion(String),

    /// The driver failed to allocate its private connection state
    #[error("driver failed to allocate connection: {0}")]
    AllocateFailed(#[from] DriverError),

    /// The handle is not in the active-handle set (already freed)
    #[error("handle is no longer active")]
    NotActive,

    /// The driver refused to open the connection
    #[error("driver failed to open connection: {0}")]
    OpenFailed(DriverError),

    /// The driver rejected the new option set
    #[error("driver rejected connection options: {0}")]
    OptionsRejected(DriverError),
}

/// Outcome of a read, write or transmit that did not succeed.
///
/// `Busy` is expected to be retried by the caller. `Disconnected` is
/// terminal for the handle until it is reopened. `Generic` is surfaced but
/// non-fatal to the process.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferError {
    /// Generic I/O failure
    #[error("i/o error")]
    Generic,

    /// The connection has disconnected
    #[error("disconnected")]
    Disconnected,

    /// The driver cannot take the data right now; retry later
    #[error("busy, retry later")]
    Busy,
}

/// Failure reported by a driver callback.
///
/// Drivers own their diagnostics; the subsystem only carries the message
/// through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DriverError(pub String);

impl DriverError {
    /// Build a driver error from any displayable message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_errors_display_distinctly() {
        assert_eq!(TransferError::Generic.to_string(), "i/o error");
        assert_eq!(TransferError::Disconnected.to_string(), "disconnected");
        assert_eq!(TransferError::Busy.to_string(), "busy, retry later");
    }

    #[test]
    fn driver_error_carries_message() {
        let err = HandleError::AllocateFailed(DriverError::new("port in use"));
        assert!(err.to_string().contains("port in use"));
    }
}

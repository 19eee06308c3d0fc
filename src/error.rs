//! Error types for the caen-hv library.

use thiserror::Error;

/// The main error type for caen-hv operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to open the TCP connection to the device.
    #[error("connect error: {0}")]
    Connect(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No response line arrived within the exchange timeout.
    #[error("exchange timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The connection dropped mid-exchange.
    #[error("connection lost: {reason}")]
    ConnectionLost { reason: String },

    /// A reply line matched neither the OK nor the ERR shape, or carried
    /// a value that failed to parse as the expected type.
    #[error("malformed response: {line:?}")]
    MalformedResponse { line: String },

    /// A command was constructed with a missing or invalid field.
    #[error("invalid command: {reason}")]
    InvalidCommand { reason: String },

    /// The device answered with an error token.
    #[error("device rejected command: {token}")]
    DeviceRejected { token: String },

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,

    /// The monitor loop is already running.
    #[error("monitor already running")]
    AlreadyRunning,

    /// The monitor loop is not running.
    #[error("monitor not running")]
    NotRunning,

    /// The metrics sink failed to accept a sample.
    #[error("metrics sink error: {0}")]
    Sink(String),
}

/// Result type alias for caen-hv operations.
pub type Result<T> = std::result::Result<T, Error>;

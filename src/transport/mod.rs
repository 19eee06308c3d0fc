//! Transport layer for device communication.
//!
//! A transport owns the connection and performs one request/response
//! exchange at a time: write one command line, read one reply line.
//! Currently TCP is the only implementation; serialization across
//! concurrent callers is the session's job, not the transport's.

pub mod tcp;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::Result;

/// Trait for transport implementations.
pub trait Transport: Send {
    /// Connects to the device.
    fn connect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Disconnects from the device.
    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Sends one encoded command line and reads exactly one reply line.
    ///
    /// The reply is returned undecoded, with its line terminator intact.
    fn exchange(&mut self, line: Bytes) -> BoxFuture<'_, Result<String>>;

    /// Returns true if connected.
    fn is_connected(&self) -> bool;
}

pub use tcp::TcpTransport;

//! # caen-hv
//!
//! An async Rust client for CAEN EN-series high-voltage power supplies
//! (DT5533E and friends) over their text-based TCP command protocol.
//!
//! The crate owns one persistent connection per device, serializes all
//! command/response exchanges onto it, decodes telemetry and the STAT
//! bitmask, and runs an optional background monitor loop that forwards
//! samples to a pluggable metrics sink.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Strict one-exchange-at-a-time discipline on the shared connection
//! - Typed command encoding and reply parsing for the `$CMD`/`#CMD` syntax
//! - Pure STAT bitmask decoding into 13 named flags
//! - Periodic monitoring with graceful stop and per-tick fault tolerance
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use caen_hv::{CaenHv, DeviceConfig, LogSink, Parameter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), caen_hv::Error> {
//!     let config = DeviceConfig::new("192.168.197.102").channel(0);
//!     let mut hv = CaenHv::tcp(&config, Arc::new(LogSink));
//!     hv.connect().await?;
//!
//!     // Background monitoring and interactive control share the
//!     // connection safely.
//!     hv.start_monitor(Duration::from_secs(1))?;
//!     hv.set_parameter(Parameter::Vset, 500.0).await?;
//!     hv.set_channel_power(true).await?;
//!
//!     hv.stop_monitor().await?;
//!     hv.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`protocol`] - Wire codec (command encoding, reply parsing, STAT flags)
//! - [`transport`] - TCP transport owning the stream
//! - [`session`] - Exclusive-access session over the transport
//! - [`monitor`] - Periodic telemetry loop
//! - [`sink`] - Metrics sink boundary (plus InfluxDB v1 behind `influx`)
//! - [`client`] - High-level [`CaenHv`] client

pub mod client;
pub mod config;
pub mod error;
pub mod monitor;
pub mod protocol;
pub mod session;
pub mod sink;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mock;

// Re-exports for convenience
pub use client::CaenHv;
pub use config::DeviceConfig;
pub use error::{Error, Result};
pub use monitor::{Monitor, MonitorSettings};
pub use protocol::{Command, Parameter, Response, StatusFlags, Value, ValueKind};
pub use session::{DeviceSession, SessionState};
pub use sink::{LogSink, MetricsSink, line_protocol};
#[cfg(feature = "influx")]
pub use sink::influx::{InfluxConfig, InfluxSink};
pub use transport::{TcpTransport, Transport, tcp::TcpConfig};
pub use types::TelemetrySample;

//! Data structures shared across the crate.

use std::time::SystemTime;

use crate::protocol::StatusFlags;

/// One complete telemetry reading of a supply channel.
///
/// Produced whole or not at all: a failed sub-read aborts the entire
/// sample so no field is ever stale or missing. The capture timestamp
/// is taken after the last read completes.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetrySample {
    /// Channel the sample was read from.
    pub channel: u8,
    /// Voltage setpoint, volts.
    pub vset: f64,
    /// Measured voltage, volts.
    pub vmon: f64,
    /// Current limit setpoint.
    pub iset: f64,
    /// Measured current.
    pub imon: f64,
    /// Overcurrent trip time threshold, seconds.
    pub trip: f64,
    /// Raw status word.
    pub stat: u32,
    /// Status word decoded into named flags.
    pub flags: StatusFlags,
    /// Capture time.
    pub timestamp: SystemTime,
}

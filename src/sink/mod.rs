//! Metrics sink boundary.
//!
//! The monitor loop hands each decoded [`TelemetrySample`] to a sink
//! through this narrow write interface; what the sink does with it
//! (InfluxDB, a log, a test buffer) is its own business. The core
//! retains no sample history.

#[cfg(feature = "influx")]
pub mod influx;

use std::fmt::Write as _;
use std::time::UNIX_EPOCH;

use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::TelemetrySample;

/// Trait for telemetry storage backends.
pub trait MetricsSink: Send + Sync {
    /// Accepts one sample for storage.
    fn write<'a>(&'a self, sample: &'a TelemetrySample) -> BoxFuture<'a, Result<()>>;
}

/// Sink that emits each sample to the tracing log.
///
/// Useful as a stand-in during bring-up, before a real store is wired.
pub struct LogSink;

impl MetricsSink for LogSink {
    fn write<'a>(&'a self, sample: &'a TelemetrySample) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            tracing::info!(
                channel = sample.channel,
                vset = sample.vset,
                vmon = sample.vmon,
                iset = sample.iset,
                imon = sample.imon,
                trip = sample.trip,
                stat = sample.stat,
                on = sample.flags.is_on,
                "telemetry sample"
            );
            Ok(())
        })
    }
}

/// Formats one sample as an InfluxDB v1 line-protocol point.
///
/// Tags are {device, channel}; fields are the six readings plus the 13
/// decoded flags; the timestamp is the sample's capture time in
/// nanoseconds since the epoch.
#[must_use]
pub fn line_protocol(measurement: &str, device: &str, sample: &TelemetrySample) -> String {
    let mut point = format!(
        "{},device={},channel={}",
        escape_tag(measurement),
        escape_tag(device),
        sample.channel
    );

    let _ = write!(
        point,
        " VSET={},VMON={},ISET={},IMON={},TRIP={},STAT={}i",
        sample.vset, sample.vmon, sample.iset, sample.imon, sample.trip, sample.stat
    );
    for (name, set) in sample.flags.fields() {
        let _ = write!(point, ",{name}={set}");
    }

    let nanos = sample
        .timestamp
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let _ = write!(point, " {nanos}");

    point
}

/// Escapes commas, spaces and equals signs in measurement/tag values.
fn escape_tag(value: &str) -> String {
    value
        .replace(',', "\\,")
        .replace(' ', "\\ ")
        .replace('=', "\\=")
}

//! InfluxDB v1 HTTP sink.
//!
//! Writes one line-protocol point per sample to the `/write` endpoint
//! of an InfluxDB 1.x server. Enabled by the `influx` cargo feature.

use futures::future::BoxFuture;

use crate::error::{Error, Result};
use crate::sink::{MetricsSink, line_protocol};
use crate::types::TelemetrySample;

/// Configuration for the InfluxDB sink.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// Server base URL, e.g. `http://192.168.197.46:8086`.
    pub url: String,
    /// Target database name.
    pub database: String,
    /// Measurement name for written points.
    pub measurement: String,
    /// Value of the `device` tag.
    pub device_tag: String,
}

impl InfluxConfig {
    /// Creates a configuration with default measurement and device tag.
    #[must_use]
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            measurement: "DT5533E".into(),
            device_tag: "DT5533E".into(),
        }
    }

    /// Sets the measurement name.
    #[must_use]
    pub fn measurement(mut self, measurement: impl Into<String>) -> Self {
        self.measurement = measurement.into();
        self
    }

    /// Sets the device tag.
    #[must_use]
    pub fn device_tag(mut self, device_tag: impl Into<String>) -> Self {
        self.device_tag = device_tag.into();
        self
    }
}

/// Sink that POSTs each sample to an InfluxDB v1 server.
pub struct InfluxSink {
    client: reqwest::Client,
    write_url: String,
    measurement: String,
    device: String,
}

impl InfluxSink {
    /// Creates a sink for the given server.
    #[must_use]
    pub fn new(config: InfluxConfig) -> Self {
        let write_url = format!(
            "{}/write?db={}",
            config.url.trim_end_matches('/'),
            config.database
        );
        Self {
            client: reqwest::Client::new(),
            write_url,
            measurement: config.measurement,
            device: config.device_tag,
        }
    }
}

impl MetricsSink for InfluxSink {
    fn write<'a>(&'a self, sample: &'a TelemetrySample) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let body = line_protocol(&self.measurement, &self.device, sample);
            let response = self
                .client
                .post(&self.write_url)
                .body(body)
                .send()
                .await
                .map_err(|e| Error::Sink(e.to_string()))?;

            if !response.status().is_success() {
                return Err(Error::Sink(format!(
                    "influx write returned {}",
                    response.status()
                )));
            }
            Ok(())
        })
    }
}

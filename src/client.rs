//! High-level [`CaenHv`] client.
//!
//! Combines the device session, the monitor loop and a metrics sink
//! into one handle with the operations an interactive front end needs:
//! start/stop monitoring, setpoint writes, output switching, kill and
//! raw passthrough. Control commands and the monitor share the same
//! session, so they interleave safely on the one wire.

use std::sync::Arc;
use std::time::Duration;

use crate::config::DeviceConfig;
use crate::error::Result;
use crate::monitor::Monitor;
use crate::protocol::{Parameter, Response};
use crate::session::{DeviceSession, SessionState};
use crate::sink::MetricsSink;
use crate::transport::{TcpTransport, Transport};
use crate::types::TelemetrySample;

/// Client for one channel of a CAEN EN-series HV supply.
pub struct CaenHv<T = TcpTransport> {
    session: DeviceSession<T>,
    monitor: Monitor<T>,
}

impl CaenHv<TcpTransport> {
    /// Creates a client for the configured TCP endpoint (not yet
    /// connected). Telemetry goes to `sink` once monitoring starts.
    #[must_use]
    pub fn tcp(config: &DeviceConfig, sink: Arc<dyn MetricsSink>) -> Self {
        Self::with_transport(
            TcpTransport::new(config.transport()),
            config.board,
            config.channel,
            config.period,
            sink,
        )
    }
}

impl<T: Transport + 'static> CaenHv<T> {
    /// Creates a client over an arbitrary transport.
    #[must_use]
    pub fn with_transport(
        transport: T,
        board: Option<u8>,
        channel: u8,
        period: Duration,
        sink: Arc<dyn MetricsSink>,
    ) -> Self {
        let session = DeviceSession::new(transport, board);
        let monitor = Monitor::new(session.clone(), sink, channel, period);
        Self { session, monitor }
    }

    /// Opens the connection to the device.
    pub async fn connect(&self) -> Result<()> {
        self.session.connect().await
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<()> {
        self.session.close().await
    }

    /// Tears down and re-dials a faulted connection.
    pub async fn reconnect(&self) -> Result<()> {
        self.session.reconnect().await
    }

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        self.session.state().await
    }

    /// Starts background monitoring with the given period.
    pub fn start_monitor(&mut self, period: Duration) -> Result<()> {
        self.monitor.start(period)
    }

    /// Stops background monitoring, letting an in-flight tick finish.
    pub async fn stop_monitor(&mut self) -> Result<()> {
        self.monitor.stop().await
    }

    /// True while monitoring is running.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_running()
    }

    /// Sets the monitor poll period, effective on the next tick.
    pub fn set_period(&self, period: Duration) {
        self.monitor.settings().set_period(period);
    }

    /// Switches the active channel for monitoring and control.
    pub fn set_channel(&self, channel: u8) {
        self.monitor.settings().set_channel(channel);
    }

    /// The active channel.
    #[must_use]
    pub fn channel(&self) -> u8 {
        self.monitor.settings().channel()
    }

    /// Reads one telemetry sample from the active channel on demand.
    pub async fn read_telemetry(&self) -> Result<TelemetrySample> {
        self.session.read_telemetry(self.channel()).await
    }

    /// Writes a setpoint on the active channel.
    pub async fn set_parameter(&self, parameter: Parameter, value: f64) -> Result<Response> {
        self.session
            .set_parameter(self.channel(), parameter, value)
            .await
    }

    /// Switches the active channel's output on or off.
    pub async fn set_channel_power(&self, on: bool) -> Result<Response> {
        self.session.set_power(self.channel(), on).await
    }

    /// Issues the power-down kill command on the active channel.
    pub async fn kill(&self) -> Result<Response> {
        self.session.kill(self.channel()).await
    }

    /// Sends an arbitrary payload and returns the decoded reply.
    pub async fn send_raw(&self, payload: &str) -> Result<Response> {
        self.session.send_raw(payload).await
    }

    /// The underlying shared session, for callers that need direct
    /// command access.
    #[must_use]
    pub const fn session(&self) -> &DeviceSession<T> {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockTransport, RecordingSink};

    fn client(mock: MockTransport) -> CaenHv<MockTransport> {
        CaenHv::with_transport(
            mock,
            None,
            0,
            Duration::from_secs(1),
            Arc::new(RecordingSink::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_interactive_commands_while_monitoring() {
        let mock = MockTransport::auto();
        let log = mock.log();
        let mut hv = client(mock);
        hv.connect().await.unwrap();

        hv.start_monitor(Duration::from_millis(10)).unwrap();
        hv.set_parameter(Parameter::Vset, 500.0).await.unwrap();
        hv.set_channel_power(true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        hv.stop_monitor().await.unwrap();

        let sent = log.lock().unwrap();
        assert!(sent.iter().any(|l| l == "$CMD:SET,CH:0,PAR:VSET,VAL:500.0\r\n"));
        assert!(sent.iter().any(|l| l == "$CMD:SET,CH:0,PAR:ON\r\n"));
        assert!(sent.iter().any(|l| l.contains("PAR:VMON")));
    }

    #[tokio::test]
    async fn test_channel_switch_applies_to_commands() {
        let mock = MockTransport::auto();
        let log = mock.log();
        let hv = client(mock);
        hv.connect().await.unwrap();

        hv.set_channel(3);
        assert_eq!(hv.channel(), 3);
        hv.kill().await.unwrap();
        assert_eq!(log.lock().unwrap()[0], "$CMD:SET,CH:3,PAR:PDWN,VAL:KILL\r\n");
    }

    #[tokio::test]
    async fn test_read_telemetry_on_demand() {
        let hv = client(MockTransport::auto());
        hv.connect().await.unwrap();

        let sample = hv.read_telemetry().await.unwrap();
        assert_eq!(sample.channel, 0);
        assert!(sample.flags.is_on);
    }

    #[tokio::test]
    async fn test_send_raw_reply_surfaces() {
        let mock = MockTransport::scripted(vec![Ok("#CMD:ERR,CH;\r\n".into())]);
        let hv = client(mock);
        hv.connect().await.unwrap();

        let err = hv.send_raw("$CMD:MON,CH:9,PAR:VMON").await.unwrap_err();
        assert!(matches!(err, crate::error::Error::DeviceRejected { .. }));
    }
}

//! Device configuration.

use std::time::Duration;

use crate::transport::tcp::{DEFAULT_PORT, DEFAULT_TIMEOUT, TcpConfig};

/// Default monitor poll period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

/// Configuration for one supply endpoint.
///
/// Carries the values the core consumes: addressing (host, port, board,
/// channel), the monitor poll period and the per-exchange timeout. How
/// these are obtained (CLI flags, files) is the caller's concern.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Device hostname or IP.
    pub host: String,
    /// Device port.
    pub port: u16,
    /// Board index for board-addressed firmware; `None` omits the
    /// `BD:` field from the wire entirely.
    pub board: Option<u8>,
    /// Channel to monitor and control.
    pub channel: u8,
    /// Monitor poll period.
    pub period: Duration,
    /// Per-exchange timeout.
    pub timeout: Duration,
}

impl DeviceConfig {
    /// Creates a configuration with default settings for the given host.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            board: None,
            channel: 0,
            period: DEFAULT_PERIOD,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the board index.
    #[must_use]
    pub const fn board(mut self, board: u8) -> Self {
        self.board = Some(board);
        self
    }

    /// Sets the channel.
    #[must_use]
    pub const fn channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Sets the monitor poll period.
    #[must_use]
    pub const fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Sets the per-exchange timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The transport-level slice of this configuration.
    #[must_use]
    pub fn transport(&self) -> TcpConfig {
        TcpConfig::new(self.host.clone())
            .port(self.port)
            .timeout(self.timeout)
    }
}

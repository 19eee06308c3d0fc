//! Device session: the single owner of the device connection.
//!
//! The session serializes every command/response exchange onto the wire.
//! The protocol has no request IDs, so ordering is the only correlation
//! mechanism between a command and its reply; the mutex on the transport
//! is therefore the correctness mechanism, not just a data-race guard.
//! Callers block on the lock in FIFO order (tokio mutexes are fair) and
//! at most one command is ever in flight.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::protocol::{Command, Parameter, Response, StatusFlags, Value};
use crate::transport::tcp::TcpConfig;
use crate::transport::{TcpTransport, Transport};
use crate::types::TelemetrySample;

/// Connection lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No connection, or closed after cleanup.
    Disconnected,
    /// Stream open and usable.
    Connected,
    /// An I/O failure left the connection unusable; reconnect to recover.
    Faulted(String),
}

struct Shared<T> {
    transport: T,
    state: SessionState,
}

/// Owns one device connection and provides exactly-one-outstanding-exchange
/// semantics to any number of concurrent callers.
///
/// Cloning is cheap and shares the underlying connection; the monitor
/// loop and an interactive caller typically hold clones of the same
/// session.
pub struct DeviceSession<T = TcpTransport> {
    inner: Arc<Mutex<Shared<T>>>,
    board: Option<u8>,
}

impl<T> Clone for DeviceSession<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            board: self.board,
        }
    }
}

impl DeviceSession<TcpTransport> {
    /// Creates a session over TCP (not yet connected).
    #[must_use]
    pub fn tcp(config: TcpConfig, board: Option<u8>) -> Self {
        Self::new(TcpTransport::new(config), board)
    }
}

impl<T: Transport> DeviceSession<T> {
    /// Creates a session over the given transport (not yet connected).
    #[must_use]
    pub fn new(transport: T, board: Option<u8>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Shared {
                transport,
                state: SessionState::Disconnected,
            })),
            board,
        }
    }

    /// Opens the connection. No-op if already connected.
    ///
    /// # Errors
    ///
    /// [`Error::Connect`] on refusal or dial timeout.
    pub async fn connect(&self) -> Result<()> {
        let mut shared = self.inner.lock().await;
        if shared.transport.is_connected() {
            return Ok(());
        }
        shared.transport.connect().await?;
        shared.state = SessionState::Connected;
        Ok(())
    }

    /// Closes the connection from any state.
    pub async fn close(&self) -> Result<()> {
        let mut shared = self.inner.lock().await;
        shared.transport.disconnect().await?;
        shared.state = SessionState::Disconnected;
        Ok(())
    }

    /// Tears down a faulted connection and dials again.
    ///
    /// The session never reconnects on its own; after a
    /// [`Error::ConnectionLost`] the caller decides whether and when to
    /// invoke this, which keeps sustained device outages from turning
    /// into silent reconnect storms.
    pub async fn reconnect(&self) -> Result<()> {
        let mut shared = self.inner.lock().await;
        shared.transport.disconnect().await?;
        shared.state = SessionState::Disconnected;
        shared.transport.connect().await?;
        shared.state = SessionState::Connected;
        Ok(())
    }

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state.clone()
    }

    /// Performs one command/response exchange.
    ///
    /// Acquires exclusive access to the connection, writes the encoded
    /// command, reads exactly one reply line within the configured
    /// timeout and decodes it.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] if no terminator arrives in time (the session
    /// stays `Connected`), [`Error::ConnectionLost`] on I/O failure
    /// (the session becomes `Faulted`), or the codec's decode errors.
    pub async fn execute(&self, command: &Command) -> Result<Response> {
        let mut shared = self.inner.lock().await;
        execute_on(&mut shared, self.board, command).await
    }

    /// Reads one complete telemetry sample from `channel`.
    ///
    /// The six parameter reads (VSET, VMON, ISET, IMON, TRIP, STAT) run
    /// strictly sequentially under a single lock acquisition, so another
    /// caller's write can never land between the reads of one sample.
    /// If any sub-read fails the whole operation fails; no partial
    /// sample is ever returned.
    pub async fn read_telemetry(&self, channel: u8) -> Result<TelemetrySample> {
        let mut shared = self.inner.lock().await;

        let vset = read_float(&mut shared, self.board, channel, Parameter::Vset).await?;
        let vmon = read_float(&mut shared, self.board, channel, Parameter::Vmon).await?;
        let iset = read_float(&mut shared, self.board, channel, Parameter::Iset).await?;
        let imon = read_float(&mut shared, self.board, channel, Parameter::Imon).await?;
        let trip = read_float(&mut shared, self.board, channel, Parameter::Trip).await?;
        let stat = read_stat(&mut shared, self.board, channel).await?;
        drop(shared);

        Ok(TelemetrySample {
            channel,
            vset,
            vmon,
            iset,
            imon,
            trip,
            stat,
            flags: StatusFlags::decode(stat),
            timestamp: SystemTime::now(),
        })
    }

    /// Writes a setpoint parameter.
    pub async fn set_parameter(
        &self,
        channel: u8,
        parameter: Parameter,
        value: f64,
    ) -> Result<Response> {
        self.execute(&Command::Write {
            channel,
            parameter,
            value,
        })
        .await
    }

    /// Switches the channel output on or off.
    ///
    /// Tries `PAR:ON`/`PAR:OFF` first and falls back to the `PW`
    /// syntax when the device rejects the bare parameter (firmware
    /// generations differ here).
    pub async fn set_power(&self, channel: u8, on: bool) -> Result<Response> {
        match self.execute(&Command::Power { channel, on }).await {
            Err(Error::DeviceRejected { token }) => {
                tracing::debug!(%token, "power parameter rejected, trying PW syntax");
                self.execute(&Command::PowerFallback { channel, on }).await
            }
            other => other,
        }
    }

    /// Issues the power-down kill command.
    pub async fn kill(&self, channel: u8) -> Result<Response> {
        self.execute(&Command::Kill { channel }).await
    }

    /// Sends an arbitrary payload and returns the decoded reply.
    pub async fn send_raw(&self, payload: &str) -> Result<Response> {
        self.execute(&Command::Raw(payload.to_owned())).await
    }
}

async fn execute_on<T: Transport>(
    shared: &mut Shared<T>,
    board: Option<u8>,
    command: &Command,
) -> Result<Response> {
    if !shared.transport.is_connected() {
        return Err(Error::NotConnected);
    }

    let line = command.encode(board)?;
    match shared.transport.exchange(line).await {
        Ok(reply) => Response::decode(&reply, command.value_kind()),
        Err(err) => {
            if matches!(err, Error::ConnectionLost { .. } | Error::Io(_)) {
                shared.state = SessionState::Faulted(err.to_string());
            }
            Err(err)
        }
    }
}

async fn read_float<T: Transport>(
    shared: &mut Shared<T>,
    board: Option<u8>,
    channel: u8,
    parameter: Parameter,
) -> Result<f64> {
    let command = Command::Read { channel, parameter };
    let response = execute_on(shared, board, &command).await?;
    match response.value {
        Some(Value::Float(v)) => Ok(v),
        _ => Err(Error::MalformedResponse {
            line: response.raw,
        }),
    }
}

async fn read_stat<T: Transport>(
    shared: &mut Shared<T>,
    board: Option<u8>,
    channel: u8,
) -> Result<u32> {
    let command = Command::Read {
        channel,
        parameter: Parameter::Stat,
    };
    let response = execute_on(shared, board, &command).await?;
    match response.value {
        Some(Value::Integer(v)) => Ok(v),
        _ => Err(Error::MalformedResponse {
            line: response.raw,
        }),
    }
}

//! TCP transport implementation.
//!
//! EN-series supplies expose their text protocol on a raw TCP port
//! (telnet port 23 by default). One persistent stream is held for the
//! transport's lifetime; reconnect replaces it.

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Default device port.
pub const DEFAULT_PORT: u16 = 23;

/// Default per-exchange timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for the TCP transport.
#[derive(Debug, Clone)]
pub struct TcpConfig {
    /// Device hostname or IP.
    pub host: String,
    /// Device port.
    pub port: u16,
    /// Bound on connecting and on waiting for a reply line.
    pub timeout: Duration,
}

impl TcpConfig {
    /// Creates a new TCP configuration with default settings.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the port.
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the per-exchange timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// TCP transport holding one persistent stream to the device.
pub struct TcpTransport {
    config: TcpConfig,
    reader: Option<BufReader<OwnedReadHalf>>,
    writer: Option<OwnedWriteHalf>,
}

impl TcpTransport {
    /// Creates a new transport with the given configuration.
    #[must_use]
    pub const fn new(config: TcpConfig) -> Self {
        Self {
            config,
            reader: None,
            writer: None,
        }
    }

    /// Creates a new transport for the given host with default settings.
    #[must_use]
    pub fn with_host(host: impl Into<String>) -> Self {
        Self::new(TcpConfig::new(host))
    }

    /// Drops both stream halves after an I/O failure.
    fn reset(&mut self) {
        self.reader = None;
        self.writer = None;
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.writer.is_some() {
                return Ok(());
            }

            tracing::info!(host = %self.config.host, port = self.config.port, "connecting");

            let addr = (self.config.host.clone(), self.config.port);
            let stream = match tokio::time::timeout(self.config.timeout, TcpStream::connect(addr))
                .await
            {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => return Err(Error::Connect(e.to_string())),
                Err(_) => {
                    return Err(Error::Connect(format!(
                        "connect to {}:{} timed out",
                        self.config.host, self.config.port
                    )));
                }
            };

            // Command lines are tiny; coalescing only adds latency.
            let _ = stream.set_nodelay(true);

            let (read, write) = stream.into_split();
            self.reader = Some(BufReader::new(read));
            self.writer = Some(write);

            tracing::info!("connected");
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.writer.is_some() || self.reader.is_some() {
                tracing::info!("disconnecting");
                self.reset();
            }
            Ok(())
        })
    }

    fn exchange(&mut self, line: Bytes) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            let timeout = self.config.timeout;

            let Some(writer) = self.writer.as_mut() else {
                return Err(Error::NotConnected);
            };
            tracing::trace!(bytes = line.len(), "sending command line");
            let write_result = async {
                writer.write_all(&line).await?;
                writer.flush().await
            }
            .await;
            if let Err(e) = write_result {
                tracing::warn!("write failed: {e}");
                self.reset();
                return Err(Error::ConnectionLost {
                    reason: e.to_string(),
                });
            }

            let Some(reader) = self.reader.as_mut() else {
                return Err(Error::NotConnected);
            };
            let mut buf = Vec::new();
            match tokio::time::timeout(timeout, reader.read_until(b'\n', &mut buf)).await {
                Err(_) => Err(Error::Timeout {
                    timeout_ms: timeout_ms(timeout),
                }),
                Ok(Err(e)) => {
                    tracing::warn!("read failed: {e}");
                    self.reset();
                    Err(Error::ConnectionLost {
                        reason: e.to_string(),
                    })
                }
                Ok(Ok(0)) => {
                    tracing::debug!("device closed the connection");
                    self.reset();
                    Err(Error::ConnectionLost {
                        reason: "connection closed by device".into(),
                    })
                }
                Ok(Ok(n)) => {
                    tracing::trace!(bytes = n, "received reply line");
                    // Replies are ASCII; stray bytes are replaced rather
                    // than failing the whole exchange.
                    Ok(String::from_utf8_lossy(&buf).into_owned())
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.writer.is_some()
    }
}

fn timeout_ms(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_config_defaults() {
        let config = TcpConfig::new("192.168.197.102");
        assert_eq!(config.host, "192.168.197.102");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_tcp_config_builder() {
        let config = TcpConfig::new("hv0")
            .port(1470)
            .timeout(Duration::from_secs(1));
        assert_eq!(config.port, 1470);
        assert_eq!(config.timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_exchange_before_connect_fails() {
        let mut transport = TcpTransport::with_host("127.0.0.1");
        assert!(!transport.is_connected());
        let err = transport
            .exchange(Bytes::from_static(b"$CMD:MON,CH:0,PAR:VMON\r\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn test_connect_refused_is_connect_error() {
        // Port 1 on loopback is essentially never listening.
        let config = TcpConfig::new("127.0.0.1")
            .port(1)
            .timeout(Duration::from_millis(500));
        let mut transport = TcpTransport::new(config);
        let err = transport.connect().await.unwrap_err();
        assert!(matches!(err, Error::Connect(_)));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_exchange_against_loopback_listener() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 128];
            let n = socket.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"$CMD:MON,CH:0,PAR:VMON\r\n");
            socket.write_all(b"#CMD:OK,VAL:42.5;\r\n").await.unwrap();
        });

        let config = TcpConfig::new(addr.ip().to_string()).port(addr.port());
        let mut transport = TcpTransport::new(config);
        transport.connect().await.unwrap();
        assert!(transport.is_connected());

        let reply = transport
            .exchange(Bytes::from_static(b"$CMD:MON,CH:0,PAR:VMON\r\n"))
            .await
            .unwrap();
        assert_eq!(reply, "#CMD:OK,VAL:42.5;\r\n");

        server.await.unwrap();
        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_silent_peer_times_out_and_stays_connected() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept but never reply.
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(socket);
        });

        let config = TcpConfig::new(addr.ip().to_string())
            .port(addr.port())
            .timeout(Duration::from_millis(100));
        let mut transport = TcpTransport::new(config);
        transport.connect().await.unwrap();

        let err = transport
            .exchange(Bytes::from_static(b"$CMD:MON,CH:0,PAR:VMON\r\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        // Timeout is transient; the stream is kept.
        assert!(transport.is_connected());

        server.abort();
    }

    #[tokio::test]
    async fn test_peer_close_is_connection_lost() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let config = TcpConfig::new(addr.ip().to_string()).port(addr.port());
        let mut transport = TcpTransport::new(config);
        transport.connect().await.unwrap();
        server.await.unwrap();

        let err = transport
            .exchange(Bytes::from_static(b"$CMD:MON,CH:0,PAR:VMON\r\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionLost { .. }));
        assert!(!transport.is_connected());
    }
}

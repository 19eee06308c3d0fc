//! In-memory transport used by unit tests to emulate a supply on the
//! wire, with scripted or derived replies and a sent-line log.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Mock transport for session and monitor tests.
///
/// Replies come from a script when one is loaded, otherwise they are
/// derived from the request: MON of STAT answers `VAL:1`, any other MON
/// answers `VAL:42.5`, and SET commands get a bare OK.
pub(crate) struct MockTransport {
    replies: Mutex<VecDeque<Result<String>>>,
    log: Arc<Mutex<Vec<String>>>,
    connected: bool,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockTransport {
    /// A mock whose replies are derived from each request.
    pub(crate) fn auto() -> Self {
        Self::scripted(Vec::new())
    }

    /// A mock that plays back `replies` in order, then derives.
    pub(crate) fn scripted(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            log: Arc::new(Mutex::new(Vec::new())),
            connected: false,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle on the log of sent lines.
    pub(crate) fn log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.log)
    }

    /// Handle on the high-water mark of concurrent exchanges.
    pub(crate) fn max_in_flight(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.max_in_flight)
    }

    fn derive_reply(line: &str) -> String {
        if line.contains("CMD:MON") {
            if line.contains("PAR:STAT") {
                "#CMD:OK,VAL:1;\r\n".to_owned()
            } else {
                "#CMD:OK,VAL:42.5;\r\n".to_owned()
            }
        } else {
            "#CMD:OK;\r\n".to_owned()
        }
    }
}

impl Transport for MockTransport {
    fn connect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.connected = true;
            Ok(())
        })
    }

    fn disconnect(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.connected = false;
            Ok(())
        })
    }

    fn exchange(&mut self, line: Bytes) -> BoxFuture<'_, Result<String>> {
        Box::pin(async move {
            if !self.connected {
                return Err(Error::NotConnected);
            }

            let text = String::from_utf8_lossy(&line).into_owned();
            self.log.lock().unwrap().push(text.clone());

            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            // Yield so that a concurrent caller would be observed if the
            // exclusion discipline ever let one through.
            tokio::time::sleep(Duration::from_millis(1)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.replies.lock().unwrap().pop_front() {
                Some(reply) => reply,
                None => Ok(Self::derive_reply(&text)),
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Sink that records every sample it is handed.
pub(crate) struct RecordingSink {
    samples: Arc<Mutex<Vec<crate::types::TelemetrySample>>>,
    fail: bool,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self {
            samples: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// A sink whose writes always fail, for error-path tests.
    pub(crate) fn failing() -> Self {
        Self {
            samples: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    pub(crate) fn samples(&self) -> Arc<Mutex<Vec<crate::types::TelemetrySample>>> {
        Arc::clone(&self.samples)
    }
}

impl crate::sink::MetricsSink for RecordingSink {
    fn write<'a>(
        &'a self,
        sample: &'a crate::types::TelemetrySample,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if self.fail {
                return Err(Error::Sink("simulated sink failure".into()));
            }
            self.samples.lock().unwrap().push(sample.clone());
            Ok(())
        })
    }
}

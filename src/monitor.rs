//! Background monitor loop.
//!
//! Periodically reads one telemetry sample through the shared session
//! and forwards it to the metrics sink. The loop runs as a dedicated
//! tokio task; stopping signals the task and waits for any in-flight
//! tick to finish, so no sample is ever abandoned mid-write.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::session::DeviceSession;
use crate::sink::MetricsSink;
use crate::transport::Transport;

/// Runtime-adjustable monitor knobs.
///
/// The loop re-reads these at every tick, so a period or channel change
/// takes effect on the next tick without a restart. Period resolution
/// is one millisecond.
#[derive(Debug)]
pub struct MonitorSettings {
    period_ms: AtomicU64,
    channel: AtomicU8,
}

impl MonitorSettings {
    fn new(period: Duration, channel: u8) -> Self {
        Self {
            period_ms: AtomicU64::new(duration_ms(period)),
            channel: AtomicU8::new(channel),
        }
    }

    /// Current poll period.
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.load(Ordering::Relaxed))
    }

    /// Sets the poll period, effective on the next tick.
    pub fn set_period(&self, period: Duration) {
        self.period_ms.store(duration_ms(period), Ordering::Relaxed);
    }

    /// Channel currently being monitored.
    pub fn channel(&self) -> u8 {
        self.channel.load(Ordering::Relaxed)
    }

    /// Sets the monitored channel, effective on the next tick.
    pub fn set_channel(&self, channel: u8) {
        self.channel.store(channel, Ordering::Relaxed);
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Periodic telemetry monitor over a shared [`DeviceSession`].
pub struct Monitor<T> {
    session: DeviceSession<T>,
    sink: Arc<dyn MetricsSink>,
    settings: Arc<MonitorSettings>,
    task: Option<JoinHandle<()>>,
    stop: Option<watch::Sender<bool>>,
}

impl<T: Transport + 'static> Monitor<T> {
    /// Creates a stopped monitor.
    #[must_use]
    pub fn new(
        session: DeviceSession<T>,
        sink: Arc<dyn MetricsSink>,
        channel: u8,
        period: Duration,
    ) -> Self {
        Self {
            session,
            sink,
            settings: Arc::new(MonitorSettings::new(period, channel)),
            task: None,
            stop: None,
        }
    }

    /// Starts ticking with the given period.
    ///
    /// # Errors
    ///
    /// [`Error::AlreadyRunning`] if the loop is already running; the
    /// running loop is unaffected.
    pub fn start(&mut self, period: Duration) -> Result<()> {
        if self.task.is_some() {
            return Err(Error::AlreadyRunning);
        }

        self.settings.set_period(period);
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run(
            self.session.clone(),
            Arc::clone(&self.sink),
            Arc::clone(&self.settings),
            stop_rx,
        ));

        self.task = Some(task);
        self.stop = Some(stop_tx);
        Ok(())
    }

    /// Stops ticking, waiting for an in-flight tick to finish.
    ///
    /// # Errors
    ///
    /// [`Error::NotRunning`] if the loop is not running.
    pub async fn stop(&mut self) -> Result<()> {
        let task = self.task.take().ok_or(Error::NotRunning)?;
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(true);
        }
        // The loop only exits between ticks, so this join is the
        // "no abandoned sample" guarantee.
        let _ = task.await;
        Ok(())
    }

    /// True while the loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// The runtime-adjustable settings shared with the running loop.
    #[must_use]
    pub fn settings(&self) -> &Arc<MonitorSettings> {
        &self.settings
    }
}

impl<T> Drop for Monitor<T> {
    fn drop(&mut self) {
        // Last resort; orderly shutdown goes through stop().
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run<T: Transport + 'static>(
    session: DeviceSession<T>,
    sink: Arc<dyn MetricsSink>,
    settings: Arc<MonitorSettings>,
    mut stop: watch::Receiver<bool>,
) {
    tracing::info!(
        channel = settings.channel(),
        period_ms = settings.period().as_millis() as u64,
        "monitor started"
    );

    loop {
        let tick_started = Instant::now();
        let channel = settings.channel();

        match session.read_telemetry(channel).await {
            Ok(sample) => {
                if let Err(e) = sink.write(&sample).await {
                    tracing::warn!(channel, "sink write failed: {e}");
                }
            }
            // A failed tick never halts monitoring.
            Err(e) => tracing::warn!(channel, "telemetry read failed: {e}"),
        }

        // Fixed cadence start-to-start; an overrun starts the next tick
        // immediately rather than bursting to catch up.
        let wait = settings.period().saturating_sub(tick_started.elapsed());
        tokio::select! {
            _ = stop.changed() => break,
            () = tokio::time::sleep(wait) => {}
        }
    }

    tracing::info!("monitor stopped");
}

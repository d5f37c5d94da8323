//! Keep-alive timer for the Zello session.
//!
//! Fires a [`KeepAliveEvent::Ping`] on a fixed wall-clock schedule; the
//! host forwards each ping to the session. `awaiting_pong` is advisory
//! telemetry only and never forces a disconnect.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::debug;

/// Events produced by the keep-alive timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveEvent {
    Ping,
}

/// Periodic ping source with advisory pong tracking.
pub struct KeepAlive {
    interval: Duration,
    events_tx: mpsc::UnboundedSender<KeepAliveEvent>,
    ping_count: Arc<AtomicU64>,
    awaiting_pong: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl KeepAlive {
    /// Create a timer and the receiving end of its event channel.
    pub fn new(interval: Duration) -> (Self, mpsc::UnboundedReceiver<KeepAliveEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                interval,
                events_tx,
                ping_count: Arc::new(AtomicU64::new(0)),
                awaiting_pong: Arc::new(AtomicBool::new(false)),
                task: None,
            },
            events_rx,
        )
    }

    /// Start ticking. Restarting replaces the previous timer.
    pub fn start(&mut self) {
        self.stop();
        let period = self.interval;
        let events_tx = self.events_tx.clone();
        let ping_count = Arc::clone(&self.ping_count);
        let awaiting_pong = Arc::clone(&self.awaiting_pong);
        debug!(interval_ms = period.as_millis() as u64, "keep-alive started");
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                ping_count.fetch_add(1, Ordering::Relaxed);
                awaiting_pong.store(true, Ordering::Relaxed);
                if events_tx.send(KeepAliveEvent::Ping).is_err() {
                    break;
                }
            }
        }));
    }

    /// Stop ticking. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("keep-alive stopped");
        }
    }

    /// Record a pong, clearing the advisory flag.
    pub fn pong_received(&self) {
        self.awaiting_pong.store(false, Ordering::Relaxed);
    }

    /// Pings emitted since creation.
    pub fn ping_count(&self) -> u64 {
        self.ping_count.load(Ordering::Relaxed)
    }

    /// True when the last ping has not been answered yet.
    pub fn awaiting_pong(&self) -> bool {
        self.awaiting_pong.load(Ordering::Relaxed)
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.stop();
    }
}

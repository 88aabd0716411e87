//! Rate limiting and cooperative cancellation
//!
//! This module handles:
//! - The `Throttle` seam the coordinator waits on before every detail fetch
//! - `RateLimiter`, a fixed-delay throttle for a single sequential caller
//! - `StopSignal`, which ends a crawl between races or days and cuts any
//!   pending delay short

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Cloneable flag that asks a running crawl to stop
///
/// Checked between days and between races; never interrupts a fetch that is
/// already in flight.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Requests a stop; every clone observes it
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once a stop has been requested
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Gate in front of every outbound detail fetch
///
/// Swapping the implementation changes the request pacing without touching
/// the coordinator's control flow.
pub trait Throttle {
    /// Blocks until the next fetch may start
    ///
    /// Returns `false` if `stop` fired first; the caller must not fetch.
    async fn wait(&mut self, stop: &StopSignal) -> bool;
}

/// Fixed-delay throttle
///
/// Every `wait` sleeps the configured delay, so N consecutive fetches take
/// at least `(N - 1) * delay` of wall-clock time.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    delay: Duration,
    waits: u64,
}

impl RateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self { delay, waits: 0 }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Number of completed waits
    pub fn waits(&self) -> u64 {
        self.waits
    }
}

impl Throttle for RateLimiter {
    async fn wait(&mut self, stop: &StopSignal) -> bool {
        if stop.is_stopped() {
            return false;
        }

        tracing::debug!("Waiting {:?} before next fetch", self.delay);

        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {
                self.waits += 1;
                true
            }
            _ = stop.stopped() => {
                tracing::info!("Stop requested during rate-limit wait");
                false
            }
        }
    }
}

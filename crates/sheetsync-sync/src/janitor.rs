//! Janitor - long-interval aggregation pass
//!
//! The fast debounce path handles interactive edits. The janitor exists only
//! to pick up payloads that path left behind (for example after a transient
//! failure was given up for the cycle). It ticks at a fixed interval and asks
//! the coordinator to run a pass; the coordinator decides whether anything
//! needs exporting.

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct Janitor {
    interval: Duration,
    shutdown: CancellationToken,
}

impl Janitor {
    /// Creates a janitor ticking every `interval`, stopped by `shutdown`
    pub fn new(interval: Duration, shutdown: CancellationToken) -> Self {
        Self { interval, shutdown }
    }

    /// Runs until cancelled or until `pass` returns false
    ///
    /// The first pass happens one full interval after start.
    pub async fn run<F>(self, mut pass: F)
    where
        F: FnMut() -> bool + Send,
    {
        info!(
            interval_secs = self.interval.as_secs(),
            "Janitor starting"
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Janitor cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    debug!("Janitor pass");
                    if !pass() {
                        debug!("Janitor target gone");
                        break;
                    }
                }
            }
        }

        info!("Janitor stopped");
    }
}

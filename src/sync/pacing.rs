use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio::{
    sync::Mutex,
    time::{sleep_until, Instant},
};

/// Decides when the next remote call is allowed to start.
#[async_trait]
pub trait Pacer {
    /// Waits until a call may start, then accounts for it.
    async fn ready(&self);
}

/// Spaces the start of two consecutive calls by at least `interval`.
/// The first call starts right away.
pub struct FixedInterval {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Pacer for FixedInterval {
    async fn ready(&self) {
        let mut last = self.last.lock().await;

        if let Some(previous) = *last {
            let next = previous + self.interval;
            if next > Instant::now() {
                debug!("pacing: waiting {:?}", next - Instant::now());
                sleep_until(next).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// Never waits, stands in for the real pacing in tests.
#[cfg(test)]
pub struct Unpaced;

#[cfg(test)]
#[async_trait]
impl Pacer for Unpaced {
    async fn ready(&self) {}
}

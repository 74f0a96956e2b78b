use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use std::time::Duration;
use tracing::debug;

/// Port for wall-clock time and blocking waits.
///
/// The scheduler only ever talks to time through this trait, so that:
/// - production uses the local system clock and real sleeps
/// - tests can jump across nights and weekends instantly
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Block for a fixed duration.
    async fn sleep(&self, duration: Duration);

    /// Block until `deadline` in a single wait. Returns immediately if the
    /// deadline has already passed.
    async fn sleep_until(&self, deadline: NaiveDateTime) {
        let remaining = deadline - self.now();
        if let Ok(remaining) = remaining.to_std() {
            self.sleep(remaining).await;
        }
    }

    /// Get the clock's name for diagnostics
    fn name(&self) -> &str {
        "Clock"
    }
}

/// Real local clock for production use
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    async fn sleep(&self, duration: Duration) {
        debug!(?duration, "sleeping");
        tokio::time::sleep(duration).await;
    }

    fn name(&self) -> &str {
        "SystemClock"
    }
}

//! Process-wide minimum-interval gate for the upstream API.
//!
//! The booking platform enforces a request quota; everything that talks to it
//! funnels through one [`RateGate`] so interactive resolution and bulk sync
//! can never burst past the limit between them. The gate is owned and
//! injected (`Arc<RateGate>`), never ambient, so tests construct isolated
//! instances.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Serializes callers so consecutive permits are at least `min_interval`
/// apart.
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateGate {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn from_millis(min_interval_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_interval_ms))
    }

    /// Blocks until at least `min_interval` has elapsed since the last
    /// permitted call, then records this call as the new reference point.
    ///
    /// The lock stays held across the sleep: waiting callers must queue
    /// behind the sleeper rather than all measuring from the same timestamp.
    pub async fn acquire(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

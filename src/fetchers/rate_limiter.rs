//! Process-wide spacing between outgoing page requests.

use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

static GLOBAL: OnceLock<Arc<RateLimiter>> = OnceLock::new();

/// Enforces a minimum interval between any two requests sharing this limiter.
///
/// The lock is held while waiting, so concurrent callers queue up instead of
/// all observing the same stale timestamp and firing together.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// The limiter shared by every fetcher in this process.
    ///
    /// The interval of the first caller wins; later calls get the same instance.
    pub fn global(min_interval: Duration) -> Arc<RateLimiter> {
        GLOBAL
            .get_or_init(|| Arc::new(RateLimiter::new(min_interval)))
            .clone()
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the interval since the previous request has elapsed,
    /// then record the current request.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

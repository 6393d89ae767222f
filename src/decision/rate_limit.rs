use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Spaces calls at least `min_interval` apart. Early callers wait; nothing is dropped.
///
/// The lock is held across the wait so concurrent callers queue up behind each other.
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.min_interval;
            if Instant::now() < ready_at {
                sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

//! Rolling-window request throttle shared by all fetch workers

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

/// Allows at most `max_requests` permits in any rolling `window`.
///
/// Waiters queue on a fair mutex, so permits are granted in arrival order.
/// The waiter at the head of the queue sleeps while holding the lock; later
/// callers cannot overtake it.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    issued: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            max_requests,
            window,
            issued: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Scryfall's published budget: 10 requests per second
    pub fn scryfall() -> Self {
        Self::new(10, Duration::from_secs(1))
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait until one more request may be issued.
    pub async fn acquire(&self) {
        let mut issued = self.issued.lock().await;

        loop {
            let now = Instant::now();
            while let Some(&oldest) = issued.front() {
                if now.duration_since(oldest) >= self.window {
                    issued.pop_front();
                } else {
                    break;
                }
            }

            if issued.len() < self.max_requests {
                issued.push_back(now);
                return;
            }

            // Full window: the oldest permit expires first
            if let Some(&oldest) = issued.front() {
                sleep_until(oldest + self.window).await;
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::scryfall()
    }
}

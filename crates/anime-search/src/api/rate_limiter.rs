//! Client-side request throttle.
//!
//! Jikan rejects bursts with 429; spacing requests out on our side keeps a
//! fast typist from tripping the server limit. Enforces both a per-second
//! interval and a sliding per-minute window.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// Rate limiter with dual constraints (per-second and per-minute)
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between two requests
    min_interval: Duration,
    /// Maximum requests per minute
    max_per_minute: usize,
    /// Request timestamps in the last minute, oldest first
    recent: VecDeque<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(max_per_second: f64, max_per_minute: u32) -> Self {
        let min_interval = if max_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / max_per_second)
        } else {
            Duration::ZERO
        };

        Self {
            min_interval,
            max_per_minute: max_per_minute.max(1) as usize,
            recent: VecDeque::with_capacity(max_per_minute as usize),
        }
    }

    /// Earliest instant the next request may start
    fn next_slot(&mut self, now: Instant) -> Instant {
        while let Some(&oldest) = self.recent.front() {
            if now.duration_since(oldest) >= WINDOW {
                self.recent.pop_front();
            } else {
                break;
            }
        }

        let mut slot = now;

        if let Some(&last) = self.recent.back() {
            slot = slot.max(last + self.min_interval);
        }

        if self.recent.len() >= self.max_per_minute {
            if let Some(&oldest) = self.recent.front() {
                slot = slot.max(oldest + WINDOW);
            }
        }

        slot
    }

    /// Wait until a request can be made, then record it
    ///
    /// Cancel-safe: if the future is dropped while waiting, no slot is
    /// consumed.
    pub async fn acquire(&mut self) {
        let now = Instant::now();
        let slot = self.next_slot(now);

        if slot > now {
            tracing::debug!(
                wait_ms = (slot - now).as_millis() as u64,
                "Rate limit: delaying request"
            );
            sleep_until(slot).await;
        }

        self.recent.push_back(Instant::now());
    }

    /// Get the current number of requests in the last minute
    pub fn current_minute_count(&mut self) -> usize {
        let now = Instant::now();
        self.next_slot(now);
        self.recent.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_per_second() {
        let mut limiter = RateLimiter::new(2.0, 50);

        let start = Instant::now();

        // Three requests at 2/s need two full intervals
        for _ in 0..3 {
            limiter.acquire().await;
        }

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_per_minute() {
        let mut limiter = RateLimiter::new(100.0, 3);

        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));

        // Fourth request waits for the oldest to leave the window
        limiter.acquire().await;
        assert!(start.elapsed() >= WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_minute_count_expires() {
        let mut limiter = RateLimiter::new(10.0, 50);
        assert_eq!(limiter.current_minute_count(), 0);

        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(limiter.current_minute_count(), 2);

        tokio::time::advance(WINDOW + Duration::from_secs(1)).await;
        assert_eq!(limiter.current_minute_count(), 0);
    }
}

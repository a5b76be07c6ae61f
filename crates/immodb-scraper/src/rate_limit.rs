//! Request pacing for portal fetches.
//!
//! Portals tolerate short bursts but throttle sustained traffic. The limiter
//! keeps a sliding window of the most recent request times: up to `burst`
//! requests pass immediately, after which each request waits until at least
//! `1 / rate` seconds have elapsed since the oldest request in the window.

use std::collections::VecDeque;

use tokio::time::{sleep, Duration, Instant};

/// Sliding-window rate limiter for a single portal.
///
/// Not internally synchronized. Callers sharing a limiter across tasks wrap
/// it in a `tokio::sync::Mutex` so waiting does not block the runtime.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    burst: usize,
    history: VecDeque<Instant>,
}

impl RateLimiter {
    /// Creates a limiter allowing `burst` immediate requests and a sustained
    /// rate of `rate` requests per second. Non-positive rates are clamped.
    #[must_use]
    pub fn new(rate: f64, burst: usize) -> Self {
        let burst = burst.max(1);
        Self {
            rate: if rate > 0.0 { rate } else { 0.1 },
            burst,
            history: VecDeque::with_capacity(burst),
        }
    }

    /// Waits until the next request is allowed, then records it.
    pub async fn acquire(&mut self) {
        if self.history.len() >= self.burst {
            let min_interval = Duration::from_secs_f64(1.0 / self.rate);
            if let Some(oldest) = self.history.front() {
                let elapsed = oldest.elapsed();
                if elapsed < min_interval {
                    sleep(min_interval - elapsed).await;
                }
            }
            self.history.pop_front();
        }
        self.history.push_back(Instant::now());
    }

    /// Forgets all recorded requests.
    pub fn reset(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_passes_without_waiting() {
        let mut limiter = RateLimiter::new(1.0, 5);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn request_past_burst_waits_for_rate_window() {
        let mut limiter = RateLimiter::new(2.0, 3);
        let start = Instant::now();
        for _ in 0..4 {
            limiter.acquire().await;
        }
        // The fourth request sits out the full 1/rate interval.
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_traffic_is_paced() {
        let mut limiter = RateLimiter::new(1.0, 1);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        // First request is free, the next two wait one second each.
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn reset_forgets_history() {
        let mut limiter = RateLimiter::new(1.0, 2);
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.reset();
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_rate_is_clamped() {
        let mut limiter = RateLimiter::new(0.0, 1);
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        // Clamped to 0.1 rps, so the second request waits ten seconds
        // instead of dividing by zero.
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}

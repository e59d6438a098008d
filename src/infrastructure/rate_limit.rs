//! Rate limiter implementation
//!
//! Sliding window over the timestamps of accepted sends.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::clock::{Clock, elapsed_between};
use crate::domain::rate_limit::{RateLimitConfig, RateLimitStatus};

#[derive(Debug)]
pub struct SlidingWindowRateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    window: Mutex<VecDeque<DateTime<Utc>>>,
}

impl SlidingWindowRateLimiter {
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            window: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether another send would be rejected now
    pub async fn is_limited(&self) -> bool {
        self.check().await.is_limited()
    }

    /// Check without recording
    pub async fn check(&self) -> RateLimitStatus {
        let now = self.clock.now();
        let mut window = self.window.lock().await;
        self.prune(&mut window, now);
        self.status(&window, now)
    }

    /// Record an accepted send
    pub async fn record(&self) {
        let now = self.clock.now();
        let mut window = self.window.lock().await;
        self.prune(&mut window, now);
        window.push_back(now);
    }

    /// Check and record in one operation
    pub async fn check_and_record(&self) -> RateLimitStatus {
        let now = self.clock.now();
        let mut window = self.window.lock().await;
        self.prune(&mut window, now);

        let status = self.status(&window, now);
        if status.allowed {
            window.push_back(now);
            return RateLimitStatus {
                remaining: status.remaining.saturating_sub(1),
                ..status
            };
        }

        status
    }

    pub async fn reset(&self) {
        self.window.lock().await.clear();
    }

    pub async fn in_window(&self) -> usize {
        let now = self.clock.now();
        let mut window = self.window.lock().await;
        self.prune(&mut window, now);
        window.len()
    }

    fn prune(&self, window: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
        while let Some(&oldest) = window.front() {
            if elapsed_between(oldest, now) >= self.config.window {
                window.pop_front();
            } else {
                break;
            }
        }
    }

    fn status(&self, window: &VecDeque<DateTime<Utc>>, now: DateTime<Utc>) -> RateLimitStatus {
        let limit = self.config.requests_per_minute;
        let count = u32::try_from(window.len()).unwrap_or(u32::MAX);

        let reset_in = window
            .front()
            .map(|&oldest| self.config.window.saturating_sub(elapsed_between(oldest, now)))
            .unwrap_or(Duration::ZERO);

        RateLimitStatus {
            allowed: count < limit,
            remaining: limit.saturating_sub(count),
            limit,
            reset_in,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;

    fn limiter(rpm: u32) -> (SlidingWindowRateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let limiter = SlidingWindowRateLimiter::new(RateLimitConfig::per_minute(rpm), clock.clone());
        (limiter, clock)
    }

    #[tokio::test]
    async fn test_rate_limiter_allows_first_request() {
        let (limiter, _) = limiter(10);

        let result = limiter.check_and_record().await;

        assert!(result.allowed);
        assert_eq!(result.remaining, 9);
        assert_eq!(result.limit, 10);
    }

    #[tokio::test]
    async fn test_rate_limiter_blocks_over_limit() {
        let (limiter, _) = limiter(2);

        limiter.check_and_record().await;
        limiter.check_and_record().await;

        let result = limiter.check().await;
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
        assert!(limiter.is_limited().await);
    }

    #[tokio::test]
    async fn test_rejected_attempts_are_not_recorded() {
        let (limiter, _) = limiter(1);

        limiter.check_and_record().await;
        limiter.check_and_record().await;
        limiter.check_and_record().await;

        assert_eq!(limiter.in_window().await, 1);
    }

    #[tokio::test]
    async fn test_window_rolls_over() {
        let (limiter, clock) = limiter(60);

        for _ in 0..60 {
            assert!(limiter.check_and_record().await.allowed);
        }
        let blocked = limiter.check_and_record().await;
        assert!(!blocked.allowed);
        assert_eq!(blocked.reset_in, Duration::from_secs(60));

        clock.advance(Duration::from_secs(30));
        assert_eq!(limiter.check().await.reset_in, Duration::from_secs(30));

        clock.advance(Duration::from_secs(31));
        assert!(limiter.check_and_record().await.allowed);
        assert_eq!(limiter.in_window().await, 1);
    }

    #[tokio::test]
    async fn test_partial_roll_over() {
        let (limiter, clock) = limiter(2);

        limiter.record().await;
        clock.advance(Duration::from_secs(40));
        limiter.record().await;
        assert!(limiter.is_limited().await);

        clock.advance(Duration::from_secs(20));
        assert!(!limiter.is_limited().await);
        assert_eq!(limiter.in_window().await, 1);
    }

    #[tokio::test]
    async fn test_rate_limiter_reset() {
        let (limiter, _) = limiter(1);

        limiter.check_and_record().await;
        assert!(limiter.is_limited().await);

        limiter.reset().await;
        assert!(!limiter.is_limited().await);
    }
}

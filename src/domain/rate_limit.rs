//! Rate limit configuration and check results

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sliding-window rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    /// Length of the sliding window
    #[serde(with = "window_secs")]
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_minute(60)
    }
}

impl RateLimitConfig {
    pub fn per_minute(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            window: Duration::from_secs(60),
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

mod window_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(window: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(window.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    /// Whether another send is allowed now
    pub allowed: bool,
    /// Sends left in the current window
    pub remaining: u32,
    pub limit: u32,
    /// Time until the oldest retained send leaves the window
    #[serde(rename = "reset_in_secs", with = "window_secs")]
    pub reset_in: Duration,
}

impl RateLimitStatus {
    pub fn is_limited(&self) -> bool {
        !self.allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_sixty_per_minute() {
        let config = RateLimitConfig::default();

        assert_eq!(config.requests_per_minute, 60);
        assert_eq!(config.window, Duration::from_secs(60));
    }

    #[test]
    fn test_window_serializes_as_seconds() {
        let config = RateLimitConfig::per_minute(10).with_window(Duration::from_secs(30));
        let json = serde_json::to_value(config).unwrap();

        assert_eq!(json["window"], 30);
        let back: RateLimitConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}

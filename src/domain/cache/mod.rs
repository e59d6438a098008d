//! Cache domain - response cache entries, keys and TTL policy

mod key;
mod policy;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::chat::ChatResponse;

pub use key::{
    AUTO_PROVIDER, CacheKeyGenerator, CacheKeyParams, DEFAULT_MODEL, Sha256KeyGenerator,
    normalize_prompt,
};
pub use policy::{PromptCategory, TtlPolicy};

/// A cached response with its expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub response: ChatResponse,
    pub inserted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// A zero TTL is widened to one millisecond so that expiry stays after insertion
    pub fn new(key: String, response: ChatResponse, inserted_at: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1);
        let expires_at = inserted_at
            .checked_add_signed(chrono::Duration::milliseconds(ttl_ms))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            key,
            response,
            inserted_at,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Response cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Cost avoided by serving responses from the cache (USD)
    pub total_savings: f64,
}

impl CacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        let lookups = self.lookups();
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

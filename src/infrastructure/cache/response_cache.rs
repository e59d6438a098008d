//! Response Cache
//!
//! Bounded map of chat responses keyed by a digest of the request. Entries
//! expire after a TTL chosen from the prompt and are evicted in insertion
//! order once the capacity is reached.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::cache::{
    CacheEntry, CacheKeyGenerator, CacheKeyParams, CacheStats, Sha256KeyGenerator, TtlPolicy,
};
use crate::domain::chat::{ChatRequest, ChatResponse};
use crate::domain::clock::Clock;
use crate::infrastructure::observability;

/// Configuration for response caching
#[derive(Debug, Clone)]
pub struct ResponseCacheConfig {
    /// Maximum number of entries
    pub capacity: usize,
    /// Responses with fewer characters are not cached
    pub min_content_length: usize,
    pub ttl: TtlPolicy,
    pub enabled: bool,
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
            min_content_length: 10,
            ttl: TtlPolicy::default(),
            enabled: true,
        }
    }
}

impl ResponseCacheConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_min_content_length(mut self, min_content_length: usize) -> Self {
        self.min_content_length = min_content_length;
        self
    }

    pub fn with_ttl_policy(mut self, ttl: TtlPolicy) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    /// Keys in insertion order
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
    evictions: u64,
    total_savings: f64,
}

impl CacheState {
    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed)
    }
}

#[derive(Debug)]
pub struct ResponseCache {
    config: ResponseCacheConfig,
    clock: Arc<dyn Clock>,
    key_generator: Arc<dyn CacheKeyGenerator>,
    state: Mutex<CacheState>,
}

impl ResponseCache {
    pub fn new(config: ResponseCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_key_generator(config, clock, Arc::new(Sha256KeyGenerator::new()))
    }

    pub fn with_key_generator(
        config: ResponseCacheConfig,
        clock: Arc<dyn Clock>,
        key_generator: Arc<dyn CacheKeyGenerator>,
    ) -> Self {
        Self {
            config,
            clock,
            key_generator,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn config(&self) -> &ResponseCacheConfig {
        &self.config
    }

    /// Cache key of a request
    ///
    /// Context is not part of the key.
    pub fn key_for(&self, request: &ChatRequest) -> String {
        let params = CacheKeyParams::for_response(
            &request.prompt,
            request.provider_id.as_deref(),
            request.model.as_deref(),
            request.temperature,
            request.max_tokens,
        );
        self.key_generator.generate(&params)
    }

    /// Looks up a live entry, dropping it if expired
    ///
    /// A hit returns a copy marked as cached and stamped with the lookup
    /// time, and credits its cost to the savings counter.
    pub async fn get(&self, key: &str) -> Option<ChatResponse> {
        if !self.config.enabled {
            return None;
        }

        let now = self.clock.now();
        let mut state = self.state.lock().await;

        let Some(expired) = state.entries.get(key).map(|e| e.is_expired(now)) else {
            state.misses += 1;
            observability::record_cache_lookup(false);
            return None;
        };

        if expired {
            state.remove(key);
            state.misses += 1;
            observability::record_cache_lookup(false);
            debug!(cache_key = %key, "Cache entry expired");
            return None;
        }

        let mut response = state.entries.get(key).map(|e| e.response.as_cached())?;
        response.timestamp = now;
        state.hits += 1;
        state.total_savings += response.cost;
        observability::record_cache_lookup(true);
        debug!(cache_key = %key, provider_id = %response.provider_id, "Cache hit");

        Some(response)
    }

    /// Stores a response, returning whether it was cached
    ///
    /// `prompt` selects the TTL category.
    pub async fn insert(&self, key: String, prompt: &str, response: &ChatResponse) -> bool {
        if !self.config.enabled || self.config.capacity == 0 {
            return false;
        }

        if response.content.chars().count() < self.config.min_content_length {
            debug!(
                cache_key = %key,
                length = response.content.len(),
                "Response too short to cache"
            );
            return false;
        }

        let now = self.clock.now();
        let ttl = self.config.ttl.ttl_for(prompt);
        let mut stored = response.clone();
        stored.cached = false;
        let entry = CacheEntry::new(key.clone(), stored, now, ttl);

        let mut state = self.state.lock().await;
        state.remove(&key);

        while state.entries.len() >= self.config.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            if state.entries.remove(&oldest).is_some() {
                state.evictions += 1;
                observability::record_cache_eviction();
                debug!(cache_key = %oldest, "Evicted oldest cache entry");
            }
        }

        state.order.push_back(key.clone());
        state.entries.insert(key, entry);
        true
    }

    /// Empties the cache and returns the number of removed entries
    ///
    /// Counters are kept.
    pub async fn clear(&self) -> usize {
        let mut state = self.state.lock().await;
        let removed = state.entries.len();
        state.entries.clear();
        state.order.clear();
        removed
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        CacheStats {
            size: state.entries.len(),
            capacity: self.config.capacity,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
            total_savings: state.total_savings,
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

//! Cache infrastructure - Response cache

mod response_cache;

pub use response_cache::{ResponseCache, ResponseCacheConfig};

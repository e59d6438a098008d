//! Cache key generation strategies

use std::collections::BTreeMap;
use std::fmt::Debug;

use sha2::{Digest, Sha256};

/// Provider component used when the router, not the caller, picks the provider
pub const AUTO_PROVIDER: &str = "auto";

/// Model component used when the caller does not override the model
pub const DEFAULT_MODEL: &str = "default";

/// Trait for generating cache keys from input data
pub trait CacheKeyGenerator: Send + Sync + Debug {
    /// Generates a cache key from the given components
    fn generate(&self, params: &CacheKeyParams) -> String;
}

/// Parameters for cache key generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheKeyParams {
    /// Primary identifier (the normalized prompt for responses)
    pub primary: String,
    /// Secondary components (sorted for consistency)
    pub components: BTreeMap<String, String>,
}

impl CacheKeyParams {
    /// Creates new cache key parameters with a primary identifier
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            components: BTreeMap::new(),
        }
    }

    /// Adds a component to the key parameters
    pub fn with_component(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.components.insert(key.into(), value.into());
        self
    }

    /// Key parameters of a chat response: prompt, provider, model, temperature, max tokens
    pub fn for_response(
        prompt: &str,
        provider_id: Option<&str>,
        model: Option<&str>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self::new(normalize_prompt(prompt))
            .with_component("provider", provider_id.unwrap_or(AUTO_PROVIDER))
            .with_component("model", model.unwrap_or(DEFAULT_MODEL))
            .with_component("temperature", format!("{:.2}", temperature))
            .with_component("max_tokens", max_tokens.to_string())
    }
}

/// Trims surrounding whitespace and unifies line endings
pub fn normalize_prompt(prompt: &str) -> String {
    prompt.trim().replace("\r\n", "\n")
}

/// Key generator producing hex SHA-256 digests
///
/// Every part is length-prefixed before hashing, so no choice of separator
/// characters inside a prompt can make two different tuples collide.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256KeyGenerator;

impl Sha256KeyGenerator {
    pub fn new() -> Self {
        Self
    }

    fn update_part(hasher: &mut Sha256, part: &str) {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
}

impl CacheKeyGenerator for Sha256KeyGenerator {
    fn generate(&self, params: &CacheKeyParams) -> String {
        let mut hasher = Sha256::new();
        Self::update_part(&mut hasher, &params.primary);

        for (k, v) in &params.components {
            Self::update_part(&mut hasher, k);
            Self::update_part(&mut hasher, v);
        }

        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(prompt: &str, provider: Option<&str>, model: Option<&str>, temp: f32, max: u32) -> String {
        Sha256KeyGenerator::new().generate(&CacheKeyParams::for_response(
            prompt, provider, model, temp, max,
        ))
    }

    #[test]
    fn test_cache_key_params_with_components() {
        let params = CacheKeyParams::new("model-1")
            .with_component("temperature", "0.7")
            .with_component("max_tokens", "100");

        assert_eq!(params.primary, "model-1");
        assert_eq!(params.components.len(), 2);
        assert_eq!(params.components.get("temperature"), Some(&"0.7".to_string()));
    }

    #[test]
    fn test_identical_tuples_produce_identical_keys() {
        let a = key("Explain traits", Some("claude"), Some("sonnet"), 0.7, 1000);
        let b = key("Explain traits", Some("claude"), Some("sonnet"), 0.7, 1000);

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_each_field_changes_the_key() {
        let base = key("Explain traits", Some("claude"), Some("sonnet"), 0.7, 1000);

        assert_ne!(base, key("Explain generics", Some("claude"), Some("sonnet"), 0.7, 1000));
        assert_ne!(base, key("Explain traits", Some("gemini"), Some("sonnet"), 0.7, 1000));
        assert_ne!(base, key("Explain traits", Some("claude"), Some("opus"), 0.7, 1000));
        assert_ne!(base, key("Explain traits", Some("claude"), Some("sonnet"), 0.2, 1000));
        assert_ne!(base, key("Explain traits", Some("claude"), Some("sonnet"), 0.7, 500));
    }

    #[test]
    fn test_prompt_is_normalized() {
        let a = key("  Explain traits \r\n", None, None, 0.7, 1000);
        let b = key("Explain traits", None, None, 0.7, 1000);

        assert_eq!(a, b);
    }

    #[test]
    fn test_auto_provider_differs_from_pinned() {
        let auto = key("hello", None, None, 0.7, 1000);
        let pinned = key("hello", Some("gemini"), None, 0.7, 1000);

        assert_ne!(auto, pinned);
    }

    #[test]
    fn test_separator_characters_do_not_collide() {
        let generator = Sha256KeyGenerator::new();
        let a = CacheKeyParams::new("a").with_component("b", "c=d");
        let b = CacheKeyParams::new("a").with_component("b=c", "d");

        assert_ne!(generator.generate(&a), generator.generate(&b));
    }
}

//! Provider domain - catalog entities and the remote-call boundary

mod adapter;
mod entity;
mod source;

pub use adapter::{ProviderAdapter, ProviderCall, ProviderReply};
pub use entity::{
    ESTIMATED_EXCHANGE_TOKENS, Provider, ProviderCategory, ProviderRateLimits, SecurityLevel,
};
pub use source::ProviderSource;

#[cfg(test)]
pub use source::MockProviderSource;

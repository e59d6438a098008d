//! Provider catalog and adapter implementations

mod fixture;
mod registry;
mod static_source;

pub use fixture::FixtureProviderAdapter;
pub use registry::{ProviderRegistry, cheapest, most_expensive};
pub use static_source::{StaticProviderSource, default_catalog};

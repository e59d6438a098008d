//! Observability infrastructure - Engine metrics

mod metrics;

pub use metrics::{
    ProviderRequestMetricParams, record_audit_flush, record_cache_eviction, record_cache_lookup,
    record_provider_request, record_rate_limited, record_security_rejection, record_spend,
    record_total_spent,
};

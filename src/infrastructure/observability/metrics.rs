//! Engine metrics recorded through the `metrics` facade
//!
//! No recorder is installed here; the embedding application decides where
//! the counters go.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Record a completed provider dispatch
pub fn record_provider_request(params: ProviderRequestMetricParams) {
    let labels = [
        ("provider", params.provider.to_string()),
        ("status", if params.success { "success" } else { "error" }.to_string()),
    ];

    counter!("engine_provider_requests_total", &labels).increment(1);
    histogram!("engine_provider_request_duration_seconds", &labels)
        .record(params.duration.as_secs_f64());

    if params.success {
        counter!("engine_tokens_total", &labels).increment(params.tokens);
    } else {
        counter!("engine_provider_failures_total", &labels).increment(1);
    }
}

/// Parameters for provider request metrics
pub struct ProviderRequestMetricParams<'a> {
    pub provider: &'a str,
    pub duration: Duration,
    pub success: bool,
    pub tokens: u64,
}

pub fn record_cache_lookup(hit: bool) {
    if hit {
        counter!("engine_cache_hits_total").increment(1);
    } else {
        counter!("engine_cache_misses_total").increment(1);
    }
}

pub fn record_cache_eviction() {
    counter!("engine_cache_evictions_total").increment(1);
}

pub fn record_rate_limited() {
    counter!("engine_rate_limited_total").increment(1);
}

pub fn record_security_rejection(detector: &str) {
    counter!("engine_security_rejections_total", "detector" => detector.to_string()).increment(1);
}

/// Record spend and savings of a billed response
pub fn record_spend(provider: &str, cost: f64, savings: f64) {
    histogram!("engine_response_cost_usd", "provider" => provider.to_string()).record(cost);
    if savings > 0.0 {
        histogram!("engine_routing_savings_usd").record(savings);
    }
}

pub fn record_total_spent(total: f64) {
    gauge!("engine_total_spent_usd").set(total);
}

pub fn record_audit_flush(entries: usize, success: bool) {
    let status = if success { "success" } else { "error" };
    counter!("engine_audit_flushes_total", "status" => status).increment(1);
    if success {
        counter!("engine_audit_entries_total").increment(entries as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_provider_request(ProviderRequestMetricParams {
            provider: "gemini",
            duration: Duration::from_millis(120),
            success: true,
            tokens: 42,
        });
        record_cache_lookup(true);
        record_security_rejection("aws_access_key");
        record_spend("gemini", 0.001, 0.0);
        record_audit_flush(5, false);
    }
}

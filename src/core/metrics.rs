//! Prometheus metrics for the gateway.
//!
//! Series names and label sets are an external contract consumed by
//! dashboards and alerting; changing them is a breaking change.

use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter_vec, CounterVec,
    HistogramVec, IntCounterVec,
};
use std::sync::OnceLock;

/// Container for all gateway metrics.
pub struct Metrics {
    /// Completed requests by api_key_id, provider, and status (success|failure)
    pub requests_total: IntCounterVec,

    /// Failed provider attempts by api_key_id, provider, and error_type
    pub errors_total: IntCounterVec,

    /// Fallback transitions by api_key_id, from_provider, and to_provider
    pub fallbacks_total: IntCounterVec,

    /// Accumulated USD cost by api_key_id, provider, and model
    pub cost_total: CounterVec,

    /// Request latency in seconds by api_key_id and provider
    pub latency_seconds: HistogramVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// Safe to call more than once; subsequent calls return the same instance.
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let requests_total = register_int_counter_vec!(
            "llm_gateway_requests_total",
            "Total number of requests",
            &["api_key_id", "provider", "status"]
        )
        .expect("Failed to register requests_total metric");

        let errors_total = register_int_counter_vec!(
            "llm_gateway_errors_total",
            "Total number of errors",
            &["api_key_id", "provider", "error_type"]
        )
        .expect("Failed to register errors_total metric");

        let fallbacks_total = register_int_counter_vec!(
            "llm_gateway_fallbacks_total",
            "Total number of fallbacks",
            &["api_key_id", "from_provider", "to_provider"]
        )
        .expect("Failed to register fallbacks_total metric");

        let cost_total = register_counter_vec!(
            "llm_gateway_cost_total",
            "Total cost in USD",
            &["api_key_id", "provider", "model"]
        )
        .expect("Failed to register cost_total metric");

        let latency_seconds = register_histogram_vec!(
            "llm_gateway_latency_seconds",
            "Request latency in seconds",
            &["api_key_id", "provider"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
        )
        .expect("Failed to register latency_seconds metric");

        Metrics {
            requests_total,
            errors_total,
            fallbacks_total,
            cost_total,
            latency_seconds,
        }
    })
}

/// Get the global metrics instance, initializing on first use.
pub fn get_metrics() -> &'static Metrics {
    init_metrics()
}

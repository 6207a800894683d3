//! Operational metrics the gateway exposes on its own `/metrics` route.

use coldstart_ore::metrics::MetricsRegistry;
use once_cell::sync::Lazy;
use prometheus::IntCounter;

/// Total requests the activation handler has seen, regardless of outcome.
pub static REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "coldstart_gateway_requests_total",
        "Total requests handled by the activation gateway.",
    )
    .expect("static metric definition is valid")
});

/// Total proxy attempts retried after a transport error or a 502/503
/// response, across every request.
pub static PROXY_RETRIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "coldstart_gateway_proxy_retries_total",
        "Total proxy attempts retried by the reverse-proxy backoff loop.",
    )
    .expect("static metric definition is valid")
});

/// Registers the gateway's collectors. Call once at startup, before
/// serving `/metrics`.
pub fn register(registry: &MetricsRegistry) {
    registry.register(Box::new(REQUESTS_TOTAL.clone()));
    registry.register(Box::new(PROXY_RETRIES_TOTAL.clone()));
}

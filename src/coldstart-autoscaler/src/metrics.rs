//! Operational metrics for the per-workload decision loop.

use coldstart_ore::metrics::MetricsRegistry;
use once_cell::sync::Lazy;
use prometheus::IntCounter;

/// Total decision cycles run across every autoscaler instance in this
/// process.
pub static DECISION_CYCLES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "coldstart_autoscaler_decision_cycles_total",
        "Total decision cycles run by per-workload autoscaler instances.",
    )
    .expect("static metric definition is valid")
});

/// Registers this crate's collectors. Call once at startup, before
/// serving `/metrics`.
pub fn register(registry: &MetricsRegistry) {
    registry.register(Box::new(DECISION_CYCLES_TOTAL.clone()));
}

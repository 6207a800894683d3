//! A thin wrapper around [`prometheus::Registry`].

use prometheus::{Encoder, Registry, TextEncoder};

/// Process-wide metrics registry. Cheaply cloneable; every collector
/// registered against one clone is visible through any other.
#[derive(Clone, Debug, Default)]
pub struct MetricsRegistry {
    inner: Registry,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a collector, panicking on a duplicate metric name. A
    /// duplicate registration is a programmer error caught at startup, not
    /// a condition to recover from.
    pub fn register(&self, collector: Box<dyn prometheus::core::Collector>) {
        self.inner
            .register(collector)
            .expect("metric name collision");
    }

    /// Renders the current state of every registered collector in the
    /// Prometheus text exposition format.
    pub fn encode_text(&self) -> Result<Vec<u8>, anyhow::Error> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&self.inner.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

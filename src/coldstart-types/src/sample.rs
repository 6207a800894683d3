//! The unit of observation the sliding window stores.

use chrono::{DateTime, Utc};

/// One scrape (or synthetic activation) data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub time: DateTime<Utc>,
    /// Average in-flight requests per ready replica at collection time.
    pub active_requests: u32,
    /// Count of replicas whose status was *running* at collection time.
    pub ready_replicas: u32,
}

impl Sample {
    /// A synthetic sample injected by the gateway after forcing
    /// activation, so the next decision cycle sees non-zero demand.
    pub fn synthetic_activation(time: DateTime<Utc>) -> Self {
        Sample {
            time,
            active_requests: 1,
            ready_replicas: 1,
        }
    }
}

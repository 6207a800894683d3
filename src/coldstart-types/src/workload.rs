//! The workload record: the declarative object the core scales.

use std::fmt;

use chrono::{DateTime, Utc};

/// The composite identity of a workload: `"<namespace>/<name>"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkloadKey {
    pub namespace: String,
    pub name: String,
}

impl WorkloadKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        WorkloadKey {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// The key used by the activation-signal map: `"<name>.<namespace>"`.
    /// Deliberately a different delimiter and order than [`WorkloadKey`]'s
    /// own `Display`, since the endpoint map and the registry map are
    /// keyed independently.
    pub fn endpoint_key(&self) -> String {
        format!("{}.{}", self.name, self.namespace)
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Autoscaling policy read from `spec.autoscale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoscaleSpec {
    pub min_replicas: u32,
    pub max_replicas: u32,
    /// Target mean in-flight requests per replica. `0` is treated as `1`
    /// (see the decision engine).
    pub concurrency: u32,
}

/// A container port exposed by the workload, used to resolve the gateway's
/// proxy target when the caller doesn't supply `X-Rio-ServicePort`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub name: String,
    pub container_port: u16,
}

/// Status fields the core reads and writes back onto the workload record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadStatus {
    pub computed_replicas: Option<u32>,
    pub observed_scale: Option<u32>,
    pub scale_from_zero_timestamp: Option<DateTime<Utc>>,
}

/// A snapshot of the declarative workload record the core depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadRecord {
    pub key: WorkloadKey,
    pub app: String,
    pub version: String,
    pub autoscale: Option<AutoscaleSpec>,
    pub container_ports: Vec<PortSpec>,
    pub status: WorkloadStatus,
}

impl WorkloadRecord {
    /// The DNS-friendly `app-version` label pair used both to select
    /// replicas and as the backend's service name.
    pub fn app_version(&self) -> String {
        format!("{}-{}", self.app, self.version)
    }

    /// True when autoscaling is configured and the replica bounds aren't
    /// pinned to a single value.
    pub fn autoscale_enabled(&self) -> bool {
        match &self.autoscale {
            Some(a) => a.min_replicas != a.max_replicas,
            None => false,
        }
    }

    /// Scans the workload's container ports for one that looks like an
    /// HTTP port (named `http` or `http-*`), falling back to the first
    /// declared port. Returns `None` if the workload declares no ports.
    pub fn http_port(&self) -> Option<u16> {
        self.container_ports
            .iter()
            .find(|p| p.name == "http" || p.name.starts_with("http-"))
            .or_else(|| self.container_ports.first())
            .map(|p| p.container_port)
    }
}

//! Trait seams between the scaling/activation core and a real orchestrator.
//!
//! The core depends only on these interfaces; a concrete binding
//! (`coldstart-kubernetes`) is the only crate that knows about
//! `kube`/`k8s-openapi`.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::workload::{WorkloadKey, WorkloadRecord};

/// A running pod, as seen by the scraper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodInfo {
    pub name: String,
    pub ip: Option<std::net::IpAddr>,
}

/// Lists the running replicas of a workload, selected by `app`/`version`
/// labels. Implementations filter to *running*-phase pods themselves;
/// callers never see pending or terminating pods.
#[async_trait]
pub trait PodCache: Send + Sync {
    async fn list_running_pods(
        &self,
        namespace: &str,
        app: &str,
        version: &str,
    ) -> anyhow::Result<Vec<PodInfo>>;
}

/// Read access to workload records.
#[async_trait]
pub trait WorkloadCache: Send + Sync {
    async fn get(&self, key: &WorkloadKey) -> anyhow::Result<Option<WorkloadRecord>>;
}

/// Write access to the subset of workload status fields the core owns.
#[async_trait]
pub trait WorkloadUpdater: Send + Sync {
    async fn update_computed_replicas(
        &self,
        key: &WorkloadKey,
        replicas: u32,
    ) -> anyhow::Result<()>;

    async fn update_observed_scale(
        &self,
        key: &WorkloadKey,
        scale: u32,
        at: chrono::DateTime<chrono::Utc>,
    ) -> anyhow::Result<()>;
}

/// A change to a workload record, as seen by the registry's watch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadEvent {
    /// The workload was created or updated and is not being deleted.
    Upserted(WorkloadRecord),
    /// The workload was deleted, or has a non-nil deletion timestamp.
    Deleted(WorkloadKey),
}

/// Streams workload lifecycle events.
pub trait WorkloadWatcher: Send + Sync {
    fn watch(&self) -> BoxStream<'static, WorkloadEvent>;
}

/// A readiness transition for one workload's endpoint object, as seen by
/// the activation-signal producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointEvent {
    /// The endpoint object changed. `ready` is the readiness predicate,
    /// already evaluated by the adapter.
    Changed { endpoint_key: String, ready: bool },
    /// The endpoint object was removed.
    Removed { endpoint_key: String },
}

/// Streams endpoint readiness events, keyed by
/// [`WorkloadKey::endpoint_key`].
pub trait EndpointWatcher: Send + Sync {
    fn watch(&self) -> BoxStream<'static, EndpointEvent>;
}

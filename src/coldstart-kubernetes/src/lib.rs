//! Concrete bindings of the scaling core's adapter traits over a real
//! Kubernetes API server, built with `kube`/`k8s-openapi` the way the
//! orchestrator integration in this workspace is built.

mod pods;
mod watch;
mod workload;

pub use pods::KubernetesPodCache;
pub use watch::{KubernetesEndpointWatcher, KubernetesWorkloadWatcher};
pub use workload::{KubernetesWorkloadCache, KubernetesWorkloadUpdater, Service, WorkloadSpec};

use std::sync::Arc;

use coldstart_context::Adapters;

/// Builds the full set of adapter bindings for one `kube::Client`.
pub fn adapters(client: kube::Client) -> Adapters {
    Adapters {
        pod_cache: Arc::new(KubernetesPodCache::new(client.clone())),
        workload_cache: Arc::new(KubernetesWorkloadCache::new(client.clone())),
        workload_updater: Arc::new(KubernetesWorkloadUpdater::new(client.clone())),
        workload_watcher: Arc::new(KubernetesWorkloadWatcher::new(client.clone())),
        endpoint_watcher: Arc::new(KubernetesEndpointWatcher::new(client)),
    }
}

//! Watch adapters: translate raw `kube::runtime::watcher` streams into
//! the core's [`WorkloadEvent`]/[`EndpointEvent`] vocabulary.

use coldstart_types::adapter::{EndpointEvent, EndpointWatcher, WorkloadEvent, WorkloadWatcher};
use coldstart_types::WorkloadKey;
use futures::stream::BoxStream;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Endpoints;
use kube::api::{Api, ListParams};
use kube::runtime::watcher::Event;
use kube::ResourceExt;
use tracing::warn;

use crate::workload::{resource_key, to_core_record, WorkloadResource};

/// Watches `rio.cattle.io/v1 Service` objects cluster-wide and flattens
/// `watcher`'s restart/bookmark bookkeeping into upsert/delete events.
/// Objects with a non-nil deletion timestamp are reported as deletions,
/// matching the semantics the registry expects.
pub struct KubernetesWorkloadWatcher {
    client: kube::Client,
}

impl KubernetesWorkloadWatcher {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

impl WorkloadWatcher for KubernetesWorkloadWatcher {
    fn watch(&self) -> BoxStream<'static, WorkloadEvent> {
        let api: Api<WorkloadResource> = Api::all(self.client.clone());
        let stream = kube::runtime::watcher(api, ListParams::default());
        Box::pin(
            stream
                .filter_map(|event| async move {
                    match event {
                        Ok(event) => Some(event),
                        Err(err) => {
                            warn!(error = %err, "workload watch stream error, ignoring");
                            None
                        }
                    }
                })
                .flat_map(|event| futures::stream::iter(flatten_workload_event(event))),
        )
    }
}

fn flatten_workload_event(event: Event<WorkloadResource>) -> Vec<WorkloadEvent> {
    match event {
        Event::Applied(obj) => vec![to_workload_event(obj)],
        Event::Deleted(obj) => vec![WorkloadEvent::Deleted(resource_key(&obj))],
        Event::Restarted(objs) => objs.into_iter().map(to_workload_event).collect(),
    }
}

fn to_workload_event(obj: WorkloadResource) -> WorkloadEvent {
    let key = resource_key(&obj);
    if obj.meta().deletion_timestamp.is_some() {
        WorkloadEvent::Deleted(key)
    } else {
        WorkloadEvent::Upserted(to_core_record(key, obj))
    }
}

fn endpoint_key(endpoints: &Endpoints) -> String {
    WorkloadKey::new(endpoints.namespace().unwrap_or_default(), endpoints.name_any()).endpoint_key()
}

/// A service's endpoints object is "ready" when it has at least one
/// subset and none of those subsets list a not-ready address: the same
/// predicate kube-proxy itself treats as "route traffic here".
fn is_ready(endpoints: &Endpoints) -> bool {
    match &endpoints.subsets {
        None => false,
        Some(subsets) if subsets.is_empty() => false,
        Some(subsets) => subsets.iter().all(|subset| {
            subset
                .not_ready_addresses
                .as_ref()
                .map(|addrs| addrs.is_empty())
                .unwrap_or(true)
        }),
    }
}

/// Watches `Endpoints` objects cluster-wide and reports readiness
/// transitions keyed by [`WorkloadKey::endpoint_key`].
pub struct KubernetesEndpointWatcher {
    client: kube::Client,
}

impl KubernetesEndpointWatcher {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

impl EndpointWatcher for KubernetesEndpointWatcher {
    fn watch(&self) -> BoxStream<'static, EndpointEvent> {
        let api: Api<Endpoints> = Api::all(self.client.clone());
        let stream = kube::runtime::watcher(api, ListParams::default());
        Box::pin(
            stream
                .filter_map(|event| async move {
                    match event {
                        Ok(event) => Some(event),
                        Err(err) => {
                            warn!(error = %err, "endpoint watch stream error, ignoring");
                            None
                        }
                    }
                })
                .flat_map(|event| futures::stream::iter(flatten_endpoint_event(event))),
        )
    }
}

fn flatten_endpoint_event(event: Event<Endpoints>) -> Vec<EndpointEvent> {
    match event {
        Event::Applied(obj) => vec![EndpointEvent::Changed {
            endpoint_key: endpoint_key(&obj),
            ready: is_ready(&obj),
        }],
        Event::Deleted(obj) => vec![EndpointEvent::Removed {
            endpoint_key: endpoint_key(&obj),
        }],
        Event::Restarted(objs) => objs
            .into_iter()
            .map(|obj| EndpointEvent::Changed {
                endpoint_key: endpoint_key(&obj),
                ready: is_ready(&obj),
            })
            .collect(),
    }
}

//! The workload custom resource and the cache/updater adapters built on
//! top of it.
//!
//! The exact wire schema here is adapter detail: the core only ever reads
//! the fields [`coldstart_types::WorkloadRecord`] exposes, so this CRD is
//! free to evolve independently of the scaling engine.

use async_trait::async_trait;
use coldstart_types::adapter::{WorkloadCache, WorkloadUpdater};
use coldstart_types::{
    AutoscaleSpec as CoreAutoscaleSpec, PortSpec as CorePortSpec, WorkloadKey, WorkloadRecord,
    WorkloadStatus as CoreWorkloadStatus,
};
use kube::api::{Api, Patch, PatchParams};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const FIELD_MANAGER: &str = "coldstartd";

/// `rio.cattle.io/v1 Service`: a replicated, optionally autoscaled
/// workload.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "rio.cattle.io",
    version = "v1",
    kind = "Service",
    namespaced,
    status = "WorkloadStatusCrd"
)]
pub struct WorkloadSpec {
    pub app: String,
    pub version: String,
    #[serde(default)]
    pub ports: Vec<PortSpecCrd>,
    pub autoscale: Option<AutoscaleSpecCrd>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct PortSpecCrd {
    pub name: String,
    pub container_port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct AutoscaleSpecCrd {
    pub min_replicas: Option<u32>,
    pub max_replicas: Option<u32>,
    #[serde(default)]
    pub concurrency: u32,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct WorkloadStatusCrd {
    pub computed_replicas: Option<u32>,
    pub observed_scale: Option<u32>,
    pub scale_from_zero_timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

/// Converts a fetched custom resource into the core's workload record.
/// `autoscale.minReplicas`/`maxReplicas` being absent is treated as
/// "autoscaling not configured" via `None` on the core side.
pub(crate) fn to_core_record(key: WorkloadKey, svc: Service) -> WorkloadRecord {
    let autoscale = svc.spec.autoscale.and_then(|a| {
        match (a.min_replicas, a.max_replicas) {
            (Some(min_replicas), Some(max_replicas)) => Some(CoreAutoscaleSpec {
                min_replicas,
                max_replicas,
                concurrency: a.concurrency,
            }),
            _ => None,
        }
    });

    let status = svc.status.unwrap_or_default();

    WorkloadRecord {
        key,
        app: svc.spec.app,
        version: svc.spec.version,
        autoscale,
        container_ports: svc
            .spec
            .ports
            .into_iter()
            .map(|p| CorePortSpec {
                name: p.name,
                container_port: p.container_port,
            })
            .collect(),
        status: CoreWorkloadStatus {
            computed_replicas: status.computed_replicas,
            observed_scale: status.observed_scale,
            scale_from_zero_timestamp: status.scale_from_zero_timestamp,
        },
    }
}

/// Reads workload records from the `rio.cattle.io/v1 Service` custom
/// resource.
pub struct KubernetesWorkloadCache {
    client: kube::Client,
}

impl KubernetesWorkloadCache {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl WorkloadCache for KubernetesWorkloadCache {
    async fn get(&self, key: &WorkloadKey) -> anyhow::Result<Option<WorkloadRecord>> {
        match self.api(&key.namespace).get(&key.name).await {
            Ok(svc) => Ok(Some(to_core_record(key.clone(), svc))),
            Err(kube::Error::Api(err)) if err.code == 404 => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Writes `status.computedReplicas`/`status.observedScale` back onto the
/// `rio.cattle.io/v1 Service` custom resource, via a server-side-apply
/// patch against the `status` subresource.
pub struct KubernetesWorkloadUpdater {
    client: kube::Client,
}

impl KubernetesWorkloadUpdater {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn patch_status(&self, key: &WorkloadKey, status: serde_json::Value) -> anyhow::Result<()> {
        let patch = serde_json::json!({
            "apiVersion": "rio.cattle.io/v1",
            "kind": "Service",
            "status": status,
        });
        self.api(&key.namespace)
            .patch_status(
                &key.name,
                &PatchParams::apply(FIELD_MANAGER).force(),
                &Patch::Apply(patch),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl WorkloadUpdater for KubernetesWorkloadUpdater {
    async fn update_computed_replicas(&self, key: &WorkloadKey, replicas: u32) -> anyhow::Result<()> {
        self.patch_status(key, serde_json::json!({ "computedReplicas": replicas }))
            .await
    }

    async fn update_observed_scale(
        &self,
        key: &WorkloadKey,
        scale: u32,
        at: chrono::DateTime<chrono::Utc>,
    ) -> anyhow::Result<()> {
        self.patch_status(
            key,
            serde_json::json!({
                "observedScale": scale,
                "scaleFromZeroTimestamp": at.to_rfc3339(),
            }),
        )
        .await
    }
}

/// Exposed for the watch adapter, which needs the unqualified resource
/// name too (deletion-timestamp inspection happens on the raw object).
pub(crate) fn resource_key(svc: &Service) -> WorkloadKey {
    WorkloadKey::new(
        svc.namespace().unwrap_or_default(),
        svc.name_any(),
    )
}

pub(crate) use Service as WorkloadResource;

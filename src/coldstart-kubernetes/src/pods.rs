//! Pod listing, selected by the `app`/`version` labels every workload's
//! pod template carries.

use async_trait::async_trait;
use coldstart_types::adapter::{PodCache, PodInfo};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};

fn is_running(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(|phase| phase == "Running")
        .unwrap_or(false)
}

fn pod_ip(pod: &Pod) -> Option<std::net::IpAddr> {
    pod.status
        .as_ref()
        .and_then(|s| s.pod_ip.as_deref())
        .and_then(|ip| ip.parse().ok())
}

/// Lists running pods for a workload via a `kube::Api<Pod>` label
/// selector, the same shape the orchestrator's service-endpoint lookups
/// use.
pub struct KubernetesPodCache {
    client: kube::Client,
}

impl KubernetesPodCache {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PodCache for KubernetesPodCache {
    async fn list_running_pods(
        &self,
        namespace: &str,
        app: &str,
        version: &str,
    ) -> anyhow::Result<Vec<PodInfo>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let selector = format!("app={app},version={version}");
        let params = ListParams::default().labels(&selector);
        let list = api.list(&params).await?;
        Ok(list
            .items
            .iter()
            .filter(|pod| is_running(pod))
            .map(|pod| PodInfo {
                name: pod.metadata.name.clone().unwrap_or_default(),
                ip: pod_ip(pod),
            })
            .collect())
    }
}

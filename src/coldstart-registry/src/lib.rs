//! Maps workload keys to running autoscaler instances and drives their
//! lifecycle from workload watch events.
//!
//! The map is the single source of truth for "is this workload under
//! autoscale management": the gateway only ever reads it, and only the
//! event-dispatch loop in [`Registry::run`] inserts or removes entries.

use std::sync::Arc;

use coldstart_autoscaler::{Autoscaler, AutoscalerDeps};
use coldstart_types::adapter::{PodCache, WorkloadCache, WorkloadUpdater, WorkloadWatcher};
use coldstart_types::{WorkloadEvent, WorkloadKey};
use dashmap::DashMap;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

/// Owns the workload-key -> autoscaler map and the adapters every new
/// instance is built with.
pub struct Registry {
    pod_cache: Arc<dyn PodCache>,
    workload_cache: Arc<dyn WorkloadCache>,
    workload_updater: Arc<dyn WorkloadUpdater>,
    instances: DashMap<WorkloadKey, Arc<Autoscaler>>,
}

impl Registry {
    pub fn new(
        pod_cache: Arc<dyn PodCache>,
        workload_cache: Arc<dyn WorkloadCache>,
        workload_updater: Arc<dyn WorkloadUpdater>,
    ) -> Self {
        Self {
            pod_cache,
            workload_cache,
            workload_updater,
            instances: DashMap::new(),
        }
    }

    /// Returns the running instance for `key`, if this process currently
    /// manages it. Used by the gateway to forward `report_sample` after
    /// forcing activation.
    pub fn lookup(&self, key: &WorkloadKey) -> Option<Arc<Autoscaler>> {
        self.instances.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Consumes workload events from `watcher` until `token` is cancelled,
    /// creating and stopping autoscaler instances as workloads' autoscale
    /// configuration changes.
    pub async fn run(&self, watcher: Arc<dyn WorkloadWatcher>, token: CancellationToken) {
        let mut events = watcher.watch();
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                event = events.next() => {
                    match event {
                        Some(event) => self.handle_event(event).await,
                        None => return,
                    }
                }
            }
        }
    }

    async fn handle_event(&self, event: WorkloadEvent) {
        match event {
            WorkloadEvent::Upserted(record) => {
                if record.autoscale_enabled() {
                    if self.instances.contains_key(&record.key) {
                        // Already managed; it re-reads the workload record
                        // on every decision cycle via the cache.
                        return;
                    }
                    let deps = AutoscalerDeps {
                        pod_cache: Arc::clone(&self.pod_cache),
                        workload_cache: Arc::clone(&self.workload_cache),
                        workload_updater: Arc::clone(&self.workload_updater),
                    };
                    let key = record.key.clone();
                    let instance = Autoscaler::new(&record, deps);
                    instance.start().await;
                    self.instances.insert(key.clone(), instance);
                    tracing::info!(%key, "autoscaler created");
                } else if let Some((key, instance)) = self.instances.remove(&record.key) {
                    instance.stop().await;
                    tracing::info!(%key, "autoscaler stopped: autoscaling disabled");
                }
            }
            WorkloadEvent::Deleted(key) => {
                if let Some((key, instance)) = self.instances.remove(&key) {
                    instance.stop().await;
                    tracing::info!(%key, "autoscaler stopped: workload deleted");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coldstart_types::adapter::PodInfo;
    use coldstart_types::{AutoscaleSpec, WorkloadRecord, WorkloadStatus};

    struct NoPods;
    #[async_trait]
    impl PodCache for NoPods {
        async fn list_running_pods(
            &self,
            _namespace: &str,
            _app: &str,
            _version: &str,
        ) -> anyhow::Result<Vec<PodInfo>> {
            Ok(Vec::new())
        }
    }

    struct EmptyCache;
    #[async_trait]
    impl WorkloadCache for EmptyCache {
        async fn get(&self, _key: &WorkloadKey) -> anyhow::Result<Option<WorkloadRecord>> {
            Ok(None)
        }
    }

    struct NoopUpdater;
    #[async_trait]
    impl WorkloadUpdater for NoopUpdater {
        async fn update_computed_replicas(
            &self,
            _key: &WorkloadKey,
            _replicas: u32,
        ) -> anyhow::Result<()> {
            Ok(())
        }
        async fn update_observed_scale(
            &self,
            _key: &WorkloadKey,
            _scale: u32,
            _at: chrono::DateTime<chrono::Utc>,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn registry() -> Registry {
        Registry::new(Arc::new(NoPods), Arc::new(EmptyCache), Arc::new(NoopUpdater))
    }

    fn record(key: WorkloadKey, autoscale: Option<AutoscaleSpec>) -> WorkloadRecord {
        WorkloadRecord {
            key,
            app: "api".into(),
            version: "v1".into(),
            autoscale,
            container_ports: vec![],
            status: WorkloadStatus::default(),
        }
    }

    #[tokio::test]
    async fn upsert_with_autoscaling_creates_an_instance() {
        let reg = registry();
        let key = WorkloadKey::new("demo", "api");
        let spec = AutoscaleSpec { min_replicas: 1, max_replicas: 10, concurrency: 10 };
        reg.handle_event(WorkloadEvent::Upserted(record(key.clone(), Some(spec)))).await;
        assert_eq!(reg.len(), 1);
        assert!(reg.lookup(&key).is_some());
    }

    #[tokio::test]
    async fn upsert_without_autoscaling_never_creates_an_instance() {
        let reg = registry();
        let key = WorkloadKey::new("demo", "api");
        reg.handle_event(WorkloadEvent::Upserted(record(key.clone(), None))).await;
        assert_eq!(reg.len(), 0);
    }

    #[tokio::test]
    async fn second_upsert_for_the_same_key_does_not_duplicate_the_instance() {
        let reg = registry();
        let key = WorkloadKey::new("demo", "api");
        let spec = AutoscaleSpec { min_replicas: 1, max_replicas: 10, concurrency: 10 };
        reg.handle_event(WorkloadEvent::Upserted(record(key.clone(), Some(spec)))).await;
        reg.handle_event(WorkloadEvent::Upserted(record(key.clone(), Some(spec)))).await;
        assert_eq!(reg.len(), 1);
    }

    #[tokio::test]
    async fn deletion_stops_and_removes_the_instance() {
        let reg = registry();
        let key = WorkloadKey::new("demo", "api");
        let spec = AutoscaleSpec { min_replicas: 1, max_replicas: 10, concurrency: 10 };
        reg.handle_event(WorkloadEvent::Upserted(record(key.clone(), Some(spec)))).await;
        reg.handle_event(WorkloadEvent::Deleted(key.clone())).await;
        assert_eq!(reg.len(), 0);
        assert!(reg.lookup(&key).is_none());
    }

    #[tokio::test]
    async fn disabling_autoscale_on_an_existing_workload_stops_it() {
        let reg = registry();
        let key = WorkloadKey::new("demo", "api");
        let spec = AutoscaleSpec { min_replicas: 1, max_replicas: 10, concurrency: 10 };
        reg.handle_event(WorkloadEvent::Upserted(record(key.clone(), Some(spec)))).await;
        let disabled = AutoscaleSpec { min_replicas: 2, max_replicas: 2, concurrency: 10 };
        reg.handle_event(WorkloadEvent::Upserted(record(key.clone(), Some(disabled)))).await;
        assert_eq!(reg.len(), 0);
    }
}

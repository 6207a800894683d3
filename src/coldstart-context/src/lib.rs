//! Process-wide glue: assembles the adapter handles, the registry, and
//! the activation-signal map once at startup, and drives the two watch
//! dispatch loops that keep them current.

use std::sync::Arc;

use coldstart_activation::ActivationSignals;
use coldstart_ore::metrics::MetricsRegistry;
use coldstart_registry::Registry;
use coldstart_types::adapter::{
    EndpointEvent, EndpointWatcher, PodCache, WorkloadCache, WorkloadUpdater, WorkloadWatcher,
};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The adapter bindings a concrete orchestrator integration provides.
pub struct Adapters {
    pub pod_cache: Arc<dyn PodCache>,
    pub workload_cache: Arc<dyn WorkloadCache>,
    pub workload_updater: Arc<dyn WorkloadUpdater>,
    pub workload_watcher: Arc<dyn WorkloadWatcher>,
    pub endpoint_watcher: Arc<dyn EndpointWatcher>,
}

/// The process-wide bundle every long-lived task (registry dispatch,
/// endpoint dispatch, gateway handlers) is built against.
pub struct Context {
    pub workload_cache: Arc<dyn WorkloadCache>,
    pub workload_updater: Arc<dyn WorkloadUpdater>,
    pub workload_watcher: Arc<dyn WorkloadWatcher>,
    pub endpoint_watcher: Arc<dyn EndpointWatcher>,
    pub registry: Arc<Registry>,
    pub signals: Arc<ActivationSignals>,
    pub metrics: MetricsRegistry,
    pub shutdown: CancellationToken,
}

/// Handles to the two dispatch loops spawned by [`Context::run`].
pub struct ContextTasks {
    registry: JoinHandle<()>,
    endpoints: JoinHandle<()>,
}

impl ContextTasks {
    /// Waits for both dispatch loops to finish, which only happens after
    /// the context's `shutdown` token is cancelled.
    pub async fn join(self) {
        let _ = self.registry.await;
        let _ = self.endpoints.await;
    }
}

impl Context {
    pub fn new(adapters: Adapters) -> Arc<Self> {
        let registry = Arc::new(Registry::new(
            Arc::clone(&adapters.pod_cache),
            Arc::clone(&adapters.workload_cache),
            Arc::clone(&adapters.workload_updater),
        ));
        Arc::new(Self {
            workload_cache: adapters.workload_cache,
            workload_updater: adapters.workload_updater,
            workload_watcher: adapters.workload_watcher,
            endpoint_watcher: adapters.endpoint_watcher,
            registry,
            signals: Arc::new(ActivationSignals::new()),
            metrics: MetricsRegistry::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Spawns the workload-watch registry dispatch loop and the
    /// endpoint-watch activation-signal dispatch loop. Both observe
    /// `self.shutdown` and exit when it's cancelled.
    pub fn run(self: &Arc<Self>) -> ContextTasks {
        let registry = {
            let this = Arc::clone(self);
            coldstart_ore::task::spawn(
                || "registry-dispatch",
                async move {
                    this.registry
                        .run(Arc::clone(&this.workload_watcher), this.shutdown.clone())
                        .await
                },
            )
        };
        let endpoints = {
            let this = Arc::clone(self);
            coldstart_ore::task::spawn(
                || "endpoint-dispatch",
                async move { this.run_endpoint_dispatch().await },
            )
        };
        ContextTasks { registry, endpoints }
    }

    async fn run_endpoint_dispatch(&self) {
        let mut events = self.endpoint_watcher.watch();
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                event = events.next() => {
                    match event {
                        Some(EndpointEvent::Changed { endpoint_key, ready }) => {
                            self.signals.on_change(&endpoint_key, ready);
                        }
                        Some(EndpointEvent::Removed { endpoint_key }) => {
                            self.signals.on_remove(&endpoint_key);
                        }
                        None => return,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coldstart_types::adapter::{EndpointEvent, PodInfo};
    use coldstart_types::{WorkloadEvent, WorkloadKey, WorkloadRecord};
    use futures::stream::{self, BoxStream};
    use std::time::Duration;

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

    struct EmptyWorkloadWatch;
    impl WorkloadWatcher for EmptyWorkloadWatch {
        fn watch(&self) -> BoxStream<'static, WorkloadEvent> {
            Box::pin(stream::empty())
        }
    }

    struct OneShotEndpointWatch;
    impl EndpointWatcher for OneShotEndpointWatch {
        fn watch(&self) -> BoxStream<'static, EndpointEvent> {
            Box::pin(stream::iter(vec![EndpointEvent::Changed {
                endpoint_key: "api.demo".to_string(),
                ready: true,
            }]))
        }
    }

    fn adapters() -> Adapters {
        Adapters {
            pod_cache: Arc::new(NoPods),
            workload_cache: Arc::new(EmptyCache),
            workload_updater: Arc::new(NoopUpdater),
            workload_watcher: Arc::new(EmptyWorkloadWatch),
            endpoint_watcher: Arc::new(OneShotEndpointWatch),
        }
    }

    #[tokio::test]
    async fn endpoint_events_are_forwarded_into_activation_signals() {
        let ctx = Context::new(adapters());
        let tasks = ctx.run();

        // The one-shot watcher emits Changed{ready:true} for a key nobody
        // registered pending interest in, so on_change is a no-op remove;
        // exercise it by waiting on the now-absent key, which proceeds.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let outcome = ctx
            .signals
            .wait_for_ready("api.demo", Duration::from_millis(10))
            .await;
        assert_eq!(outcome, coldstart_activation::ActivationOutcome::Proceed);

        ctx.shutdown.cancel();
        tasks.join().await;
    }
}

//! The activation gateway: the HTTP front door that forces a parked
//! workload to scale up, waits for it to become ready, and reverse-proxies
//! the original request once it is.

mod handler;
mod headers;
mod metrics;
mod proxy;
mod server;

use std::net::SocketAddr;
use std::sync::Arc;

pub use handler::{GatewayState, ACTIVATION_TIMEOUT};
pub use headers::{
    NAMESPACE_HEADER, RETRY_COUNT_HEADER, SERVICE_NAME_HEADER, SERVICE_PORT_HEADER,
};
pub use metrics::register as register_metrics;
pub use proxy::ProxyClients;
pub use server::router;

/// Binds and runs the gateway HTTP server until `shutdown` resolves.
pub async fn serve(
    state: Arc<GatewayState>,
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()>,
) -> anyhow::Result<()> {
    tracing::info!(%addr, "gateway listening");
    axum::Server::bind(&addr)
        .serve(router(state).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coldstart_activation::ActivationSignals;
    use coldstart_ore::metrics::MetricsRegistry;
    use coldstart_registry::Registry;
    use coldstart_types::adapter::{PodCache, PodInfo, WorkloadCache, WorkloadUpdater};
    use coldstart_types::{WorkloadKey, WorkloadRecord, WorkloadStatus};
    use http::Request;
    use tower::ServiceExt;

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

    struct MissingWorkload;
    #[async_trait]
    impl WorkloadCache for MissingWorkload {
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

    fn state() -> Arc<GatewayState> {
        Arc::new(GatewayState {
            workload_cache: Arc::new(MissingWorkload),
            workload_updater: Arc::new(NoopUpdater),
            registry: Arc::new(Registry::new(
                Arc::new(NoPods),
                Arc::new(MissingWorkload),
                Arc::new(NoopUpdater),
            )),
            signals: Arc::new(ActivationSignals::new()),
            clients: ProxyClients::new(),
            metrics: MetricsRegistry::new(),
        })
    }

    #[tokio::test]
    async fn missing_service_name_header_is_rejected() {
        let app = router(state());
        let req = Request::builder().uri("/").body(axum::body::Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_workload_is_unavailable() {
        let app = router(state());
        let req = Request::builder()
            .uri("/")
            .header(SERVICE_NAME_HEADER, "api")
            .header(NAMESPACE_HEADER, "demo")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn livez_reports_ok() {
        let app = router(state());
        let req = Request::builder()
            .uri("/api/livez")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_endpoint_is_served() {
        let app = router(state());
        let req = Request::builder()
            .uri("/metrics")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
    }
}

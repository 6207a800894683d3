//! The activation handler: force scale-from-zero, wait for readiness,
//! reverse-proxy with retry.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use chrono::Utc;
use coldstart_activation::{ActivationOutcome, ActivationSignals};
use coldstart_ore::metrics::MetricsRegistry;
use coldstart_registry::Registry;
use coldstart_types::adapter::{WorkloadCache, WorkloadUpdater};
use coldstart_types::WorkloadKey;
use http::{HeaderMap, Request, Response, StatusCode};

use crate::headers::{
    NAMESPACE_HEADER, RETRY_COUNT_HEADER, SERVICE_NAME_HEADER, SERVICE_PORT_HEADER,
};
use crate::proxy::{proxy_with_retry, ProxyClients, ProxyOutcome};

/// How long the gateway waits for an activated workload to become ready
/// before giving up with a `504`.
pub const ACTIVATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything the handler needs, shared across every request.
pub struct GatewayState {
    pub workload_cache: Arc<dyn WorkloadCache>,
    pub workload_updater: Arc<dyn WorkloadUpdater>,
    pub registry: Arc<Registry>,
    pub signals: Arc<ActivationSignals>,
    pub clients: ProxyClients,
    pub metrics: MetricsRegistry,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn text_response(status: StatusCode, message: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(message.to_string()))
        .expect("a status + plain text body is always a valid response")
}

/// The single catch-all handler: every path and method funnels through
/// here, distinguished only by the workload identity headers.
pub async fn handle(State(state): State<Arc<GatewayState>>, req: Request<Body>) -> Response<Body> {
    crate::metrics::REQUESTS_TOTAL.inc();
    let (parts, body) = req.into_parts();

    let Some(name) = header_str(&parts.headers, SERVICE_NAME_HEADER) else {
        return text_response(StatusCode::BAD_REQUEST, "missing X-Rio-ServiceName");
    };
    let Some(namespace) = header_str(&parts.headers, NAMESPACE_HEADER) else {
        return text_response(StatusCode::BAD_REQUEST, "missing X-Rio-Namespace");
    };
    let port_header = header_str(&parts.headers, SERVICE_PORT_HEADER).map(str::to_string);

    let key = WorkloadKey::new(namespace, name);

    let record = match state.workload_cache.get(&key).await {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::warn!(%key, "workload not found");
            return text_response(StatusCode::SERVICE_UNAVAILABLE, "workload not found");
        }
        Err(err) => {
            tracing::warn!(%key, error = %err, "failed to fetch workload");
            return text_response(StatusCode::SERVICE_UNAVAILABLE, "failed to fetch workload");
        }
    };

    if record.status.observed_scale.unwrap_or(0) == 0 {
        let now = Utc::now();
        if let Err(err) = state
            .workload_updater
            .update_observed_scale(&key, 1, now)
            .await
        {
            tracing::warn!(%key, error = %err, "failed to force scale from zero");
            return text_response(StatusCode::SERVICE_UNAVAILABLE, "failed to force activation");
        }
        tracing::info!(%key, "forced scale from zero");
    }

    if let Some(instance) = state.registry.lookup(&key) {
        instance.report_sample();
    }

    let port = port_header
        .and_then(|p| p.parse::<u16>().ok())
        .or_else(|| record.http_port())
        .unwrap_or(80);
    let host = format!("{}.{}.svc.cluster.local", record.app_version(), key.namespace);

    let endpoint_key = key.endpoint_key();
    match state
        .signals
        .wait_for_ready(&endpoint_key, ACTIVATION_TIMEOUT)
        .await
    {
        ActivationOutcome::Timeout => {
            tracing::warn!(%key, "activation wait timed out");
            return text_response(StatusCode::GATEWAY_TIMEOUT, "activation timed out");
        }
        ActivationOutcome::Proceed => {}
    }

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let target = format!("http://{host}:{port}{path_and_query}");

    let buffered = match hyper::body::to_bytes(body).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(%key, error = %err, "failed to buffer request body");
            return text_response(StatusCode::BAD_GATEWAY, "failed to read request body");
        }
    };

    let method = parts.method.clone();
    let headers = parts.headers.clone();
    let version = parts.version;

    let outcome = proxy_with_retry(&state.clients, version, buffered, |body, attempt| {
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(target.clone())
            .version(version);
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }
        builder = builder.header(RETRY_COUNT_HEADER, attempt.to_string());
        builder
            .body(Body::from(body.clone()))
            .expect("a rebuilt request with the original headers is always valid")
    })
    .await;

    match outcome {
        ProxyOutcome::Response(response) => {
            tracing::debug!(%key, status = %response.status(), "proxied request");
            response
        }
        ProxyOutcome::TransportError(err) => {
            tracing::error!(%key, error = %err, "backend proxy failed after exhausting retries");
            text_response(StatusCode::INTERNAL_SERVER_ERROR, "backend unreachable")
        }
    }
}

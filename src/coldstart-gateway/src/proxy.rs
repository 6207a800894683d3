//! The reverse-proxy transport: HTTP-version selection layered
//! independently from the retry loop.

use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use hyper::client::HttpConnector;
use hyper::{Body, Client};

/// Bounded attempts; matches the schedule below (first delay 100ms,
/// factor 1.3).
const MAX_ATTEMPTS: u32 = 18;
const INITIAL_DELAY: Duration = Duration::from_millis(100);
const FACTOR: f64 = 1.3;

/// Two hyper clients that differ only in transport. Which one a request
/// uses is decided by the protocol version of the *incoming* request, not
/// by TLS negotiation -- there is none; the backend is always cleartext.
pub struct ProxyClients {
    h1: Client<HttpConnector>,
    h2c: Client<HttpConnector>,
}

impl Default for ProxyClients {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyClients {
    pub fn new() -> Self {
        Self {
            h1: Client::builder().build_http(),
            // `http2_only` makes this client speak HTTP/2 with prior
            // knowledge over a plain TCP connection: h2c.
            h2c: Client::builder().http2_only(true).build_http(),
        }
    }

    fn select(&self, version: http::Version) -> &Client<HttpConnector> {
        if version == http::Version::HTTP_2 {
            &self.h2c
        } else {
            &self.h1
        }
    }
}

/// The outcome of a fully-retried proxy attempt.
pub enum ProxyOutcome {
    /// A response was received, possibly a `502`/`503` after exhausting
    /// every retry.
    Response(Response<Body>),
    /// Every attempt failed at the transport level.
    TransportError(String),
}

/// Proxies one request through `clients`, buffering the body up front
/// (`body`) so it can be replayed on every attempt. Retries on transport
/// errors and on `502`/`503` responses, sleeping an exponentially growing
/// delay between attempts, up to [`MAX_ATTEMPTS`].
///
/// `build_request` is called once per attempt (1-based attempt index) so
/// the caller can set `Request-Retry-Count` and rebuild the body from the
/// buffered bytes.
pub async fn proxy_with_retry(
    clients: &ProxyClients,
    version: http::Version,
    body: Bytes,
    mut build_request: impl FnMut(&Bytes, u32) -> Request<Body>,
) -> ProxyOutcome {
    let client = clients.select(version);
    let backoff = coldstart_ore::retry::Backoff {
        initial: INITIAL_DELAY,
        factor: FACTOR,
        steps: MAX_ATTEMPTS,
    };
    let mut delays = backoff.delays();

    let mut last_error = String::new();
    for attempt in 1..=MAX_ATTEMPTS {
        let request = build_request(&body, attempt);
        match client.request(request).await {
            Ok(response) => {
                let retryable = matches!(
                    response.status(),
                    StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE
                );
                if !retryable || attempt == MAX_ATTEMPTS {
                    return ProxyOutcome::Response(response);
                }
                crate::metrics::PROXY_RETRIES_TOTAL.inc();
                tracing::debug!(attempt, status = %response.status(), "retrying proxy attempt");
            }
            Err(err) => {
                tracing::warn!(attempt, error = %err, "proxy attempt failed");
                last_error = err.to_string();
                if attempt == MAX_ATTEMPTS {
                    return ProxyOutcome::TransportError(last_error);
                }
                crate::metrics::PROXY_RETRIES_TOTAL.inc();
            }
        }
        if let Some(delay) = delays.next() {
            tokio::time::sleep(delay).await;
        }
    }

    ProxyOutcome::TransportError(last_error)
}

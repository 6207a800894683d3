//! Scrapes per-replica request counters and turns them into a [`Sample`].
//!
//! A scrape cycle never fails: a pod that can't be reached, or whose
//! response can't be parsed, contributes zero and is logged, but the
//! cycle always produces a sample.

mod parse;

use chrono::Utc;
use coldstart_types::adapter::PodCache;
use coldstart_types::Sample;

pub use parse::PodCounters;

/// Port every replica's metrics endpoint is expected to listen on.
pub const METRICS_PORT: u16 = 4191;

/// Scrapes replicas of one workload and aggregates them into a single
/// sample.
pub struct Scraper {
    client: reqwest::Client,
}

impl Default for Scraper {
    fn default() -> Self {
        Self::new()
    }
}

impl Scraper {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Runs one scrape cycle against the workload identified by
    /// `namespace`/`app`/`version`, using `pod_cache` to discover running
    /// replicas.
    ///
    /// Always returns a `Sample`, even if every pod fails or none exist.
    pub async fn scrape(
        &self,
        pod_cache: &dyn PodCache,
        namespace: &str,
        app: &str,
        version: &str,
    ) -> Sample {
        let authority = format!("{app}-{version}.{namespace}.svc.cluster.local");

        let pods = match pod_cache.list_running_pods(namespace, app, version).await {
            Ok(pods) => pods,
            Err(err) => {
                tracing::warn!(namespace, app, version, error = %err, "failed to list pods for scrape");
                Vec::new()
            }
        };

        let mut total_active: u32 = 0;
        let mut ready_replicas: u32 = 0;

        for pod in &pods {
            let Some(ip) = pod.ip else {
                tracing::warn!(pod = %pod.name, "pod has no IP, skipping");
                continue;
            };
            let url = format!("http://{ip}:{METRICS_PORT}/metrics");
            match self.client.get(&url).send().await {
                Ok(resp) => match resp.text().await {
                    Ok(body) => {
                        let counters = parse::parse_counters(&body, &authority);
                        total_active += counters.active();
                        ready_replicas += 1;
                    }
                    Err(err) => {
                        tracing::warn!(pod = %pod.name, error = %err, "failed to read metrics body");
                    }
                },
                Err(err) => {
                    tracing::warn!(pod = %pod.name, error = %err, "failed to scrape metrics endpoint");
                }
            }
        }

        tracing::debug!(
            namespace,
            app,
            version,
            total_active,
            ready_replicas,
            "scrape cycle complete"
        );

        let average = if ready_replicas == 0 {
            0
        } else {
            total_active / ready_replicas
        };

        Sample {
            time: Utc::now(),
            active_requests: average,
            ready_replicas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coldstart_types::adapter::PodInfo;

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

    struct Unreachable;

    #[async_trait]
    impl PodCache for Unreachable {
        async fn list_running_pods(
            &self,
            _namespace: &str,
            _app: &str,
            _version: &str,
        ) -> anyhow::Result<Vec<PodInfo>> {
            Ok(vec![PodInfo {
                name: "ghost".into(),
                ip: Some("127.0.0.1".parse().unwrap()),
            }])
        }
    }

    #[tokio::test]
    async fn empty_pod_list_yields_zero_sample() {
        let scraper = Scraper::new();
        let sample = scraper.scrape(&NoPods, "demo", "api", "v1").await;
        assert_eq!(sample.ready_replicas, 0);
        assert_eq!(sample.active_requests, 0);
    }

    #[tokio::test]
    async fn unreachable_pod_never_fails_the_cycle() {
        // Port 1 is not something anything is listening on in a test sandbox.
        let scraper = Scraper::new();
        let sample = scraper.scrape(&Unreachable, "demo", "api", "v1").await;
        assert_eq!(sample.ready_replicas, 0);
        assert_eq!(sample.active_requests, 0);
    }
}

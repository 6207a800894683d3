//! Owns one workload's sliding window, scraper, and decision engine, and
//! runs the three cooperative loops that drive them.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use coldstart_decision::Bounds;
use coldstart_scraper::Scraper;
use coldstart_types::adapter::{PodCache, WorkloadCache, WorkloadUpdater};
use coldstart_types::{Sample, WorkloadKey, WorkloadRecord};
use coldstart_window::{SlidingWindow, DEFAULT_RECENT_WINDOW, RETENTION};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod metrics;
pub use metrics::register as register_metrics;

const SCRAPE_TICK: Duration = Duration::from_secs(5);
const DECIDE_TICK: Duration = Duration::from_secs(15);
const HOUSEKEEP_TICK: Duration = Duration::from_secs(5 * 60);

/// The external handles an autoscaler instance needs but never owns.
pub struct AutoscalerDeps {
    pub pod_cache: Arc<dyn PodCache>,
    pub workload_cache: Arc<dyn WorkloadCache>,
    pub workload_updater: Arc<dyn WorkloadUpdater>,
}

struct Tasks {
    scrape: JoinHandle<()>,
    decide: JoinHandle<()>,
    housekeep: JoinHandle<()>,
}

/// One running autoscaler instance for a single workload.
pub struct Autoscaler {
    key: WorkloadKey,
    namespace: String,
    app: String,
    version: String,
    window: SlidingWindow,
    last_computed: StdMutex<u32>,
    scraper: Scraper,
    deps: AutoscalerDeps,
    token: CancellationToken,
    tasks: AsyncMutex<Option<Tasks>>,
}

impl Autoscaler {
    /// Builds (but does not start) an instance seeded from the current
    /// workload record. `last_computed` is seeded from
    /// `status.computedReplicas`, defaulting to `0`.
    pub fn new(record: &WorkloadRecord, deps: AutoscalerDeps) -> Arc<Self> {
        Arc::new(Self {
            key: record.key.clone(),
            namespace: record.key.namespace.clone(),
            app: record.app.clone(),
            version: record.version.clone(),
            window: SlidingWindow::new(),
            last_computed: StdMutex::new(record.status.computed_replicas.unwrap_or(0)),
            scraper: Scraper::new(),
            deps,
            token: CancellationToken::new(),
            tasks: AsyncMutex::new(None),
        })
    }

    pub fn key(&self) -> &WorkloadKey {
        &self.key
    }

    /// Spawns the scrape, decide, and housekeeping loops. Calling this
    /// more than once on the same instance would spawn duplicate loops;
    /// the registry only ever calls it once per instance.
    pub async fn start(self: &Arc<Self>) {
        let scrape = coldstart_ore::task::spawn(
            || format!("autoscaler-scrape-{}", self.key),
            Arc::clone(self).run_scrape_loop(),
        );
        let decide = coldstart_ore::task::spawn(
            || format!("autoscaler-decide-{}", self.key),
            Arc::clone(self).run_decide_loop(),
        );
        let housekeep = coldstart_ore::task::spawn(
            || format!("autoscaler-housekeep-{}", self.key),
            Arc::clone(self).run_housekeep_loop(),
        );
        *self.tasks.lock().await = Some(Tasks {
            scrape,
            decide,
            housekeep,
        });
    }

    /// Appends a synthetic sample (`activeRequests=1, readyReplicas=1`),
    /// invoked by the gateway right after it forces activation so the next
    /// decision cycle sees non-zero demand.
    pub fn report_sample(&self) {
        self.window.append(Sample::synthetic_activation(Utc::now()));
    }

    /// Cancels all three loops and waits for them to finish. Safe to call
    /// more than once; the second call is a no-op since the task handles
    /// are already taken.
    pub async fn stop(&self) {
        self.token.cancel();
        if let Some(tasks) = self.tasks.lock().await.take() {
            let _ = tasks.scrape.await;
            let _ = tasks.decide.await;
            let _ = tasks.housekeep.await;
        }
    }

    async fn run_scrape_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(SCRAPE_TICK);
        loop {
            tokio::select! {
                _ = self.token.cancelled() => return,
                _ = interval.tick() => {
                    let sample = self
                        .scraper
                        .scrape(self.deps.pod_cache.as_ref(), &self.namespace, &self.app, &self.version)
                        .await;
                    self.window.append(sample);
                }
            }
        }
    }

    async fn run_decide_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(DECIDE_TICK);
        loop {
            tokio::select! {
                _ = self.token.cancelled() => return,
                _ = interval.tick() => self.run_decision_cycle().await,
            }
        }
    }

    async fn run_decision_cycle(&self) {
        metrics::DECISION_CYCLES_TOTAL.inc();
        let record = match self.deps.workload_cache.get(&self.key).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(key = %self.key, "workload disappeared before decision cycle");
                return;
            }
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "failed to read workload for decision cycle");
                return;
            }
        };

        let autoscale = record.autoscale.unwrap_or(coldstart_types::AutoscaleSpec {
            min_replicas: 0,
            max_replicas: 0,
            concurrency: 1,
        });
        let bounds = Bounds {
            min_replicas: autoscale.min_replicas,
            max_replicas: autoscale.max_replicas,
            concurrency: autoscale.concurrency,
        };

        let recent = self.window.read(DEFAULT_RECENT_WINDOW);
        let last_computed = *self.last_computed.lock().expect("lock poisoned");

        let decision = coldstart_decision::decide(
            &recent,
            bounds,
            last_computed,
            record.status.computed_replicas,
            record.status.scale_from_zero_timestamp,
            Utc::now(),
        );

        if let coldstart_decision::Decision::Write(value) = decision {
            match self
                .deps
                .workload_updater
                .update_computed_replicas(&self.key, value)
                .await
            {
                Ok(()) => {
                    *self.last_computed.lock().expect("lock poisoned") = value;
                    tracing::info!(key = %self.key, computed_replicas = value, "wrote decision");
                }
                Err(err) => {
                    tracing::warn!(key = %self.key, error = %err, "failed to write computed replicas");
                }
            }
        }
    }

    async fn run_housekeep_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(HOUSEKEEP_TICK);
        loop {
            tokio::select! {
                _ = self.token.cancelled() => return,
                _ = interval.tick() => {
                    let cutoff = Utc::now() - chrono::Duration::from_std(RETENTION).expect("retention fits in chrono::Duration");
                    self.window.evict_older_than(cutoff);
                }
            }
        }
    }
}

//! A time-ordered, append-only buffer of [`Sample`]s with age-based
//! eviction.
//!
//! Samples are expected (but not required; see `append`'s contract) to
//! arrive in non-decreasing `time` order. `evictOlderThan` removes a
//! prefix of the buffer on that assumption, which is why a
//! synthetic sample injected out of band (the gateway's `ReportSample`)
//! is still safe to interleave: it only ever makes the buffer "more
//! current," never stale.

use std::collections::VecDeque;
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use coldstart_types::Sample;

/// How long a sample is retained before housekeeping evicts it.
pub const RETENTION: Duration = Duration::from_secs(5 * 60);

/// The number of most-recent samples the decision engine reads by default.
pub const DEFAULT_RECENT_WINDOW: usize = 12;

/// A thread-safe, time-ordered buffer of samples.
#[derive(Default)]
pub struct SlidingWindow {
    samples: RwLock<VecDeque<Sample>>,
}

impl SlidingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample under an exclusive lock. O(1) amortized.
    pub fn append(&self, sample: Sample) {
        let mut samples = self.samples.write().expect("lock poisoned");
        samples.push_back(sample);
    }

    /// Returns (a copy of) the last `n` samples, or all of them if fewer
    /// than `n` are stored, under a shared lock.
    pub fn read(&self, n: usize) -> Vec<Sample> {
        let samples = self.samples.read().expect("lock poisoned");
        let start = samples.len().saturating_sub(n);
        samples.iter().skip(start).copied().collect()
    }

    /// Removes every sample older than `cutoff`. O(k) in the number of
    /// samples removed.
    pub fn evict_older_than(&self, cutoff: DateTime<Utc>) {
        let mut samples = self.samples.write().expect("lock poisoned");
        let mut evicted = 0;
        while let Some(front) = samples.front() {
            if front.time < cutoff {
                samples.pop_front();
                evicted += 1;
            } else {
                break;
            }
        }
        if evicted > 0 {
            tracing::debug!(evicted, remaining = samples.len(), "evicted stale samples");
        }
    }

    /// Number of samples currently stored. Exposed for tests and metrics.
    pub fn len(&self) -> usize {
        self.samples.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn sample(secs: i64, active: u32, ready: u32) -> Sample {
        Sample {
            time: at(secs),
            active_requests: active,
            ready_replicas: ready,
        }
    }

    #[test]
    fn read_returns_fewer_than_n_when_buffer_is_short() {
        let w = SlidingWindow::new();
        w.append(sample(1, 1, 1));
        w.append(sample(2, 2, 1));
        assert_eq!(w.read(12).len(), 2);
    }

    #[test]
    fn read_returns_last_n_in_order() {
        let w = SlidingWindow::new();
        for i in 0..20 {
            w.append(sample(i, i as u32, 1));
        }
        let last = w.read(5);
        assert_eq!(last.len(), 5);
        assert_eq!(last.first().unwrap().active_requests, 15);
        assert_eq!(last.last().unwrap().active_requests, 19);
    }

    #[test]
    fn evict_older_than_removes_only_the_stale_prefix() {
        let w = SlidingWindow::new();
        w.append(sample(0, 1, 1));
        w.append(sample(100, 1, 1));
        w.append(sample(400, 1, 1));
        w.evict_older_than(at(350));
        let remaining = w.read(10);
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].time, at(400));
    }

    #[test]
    fn no_sample_survives_older_than_retention_after_housekeeping() {
        let w = SlidingWindow::new();
        let now = at(10_000);
        for offset in [0, 100, 250, 299, 301, 600] {
            w.append(sample(10_000 - 600 + offset, 1, 1));
        }
        let cutoff = now - chrono::Duration::from_std(RETENTION).unwrap();
        w.evict_older_than(cutoff);
        for s in w.read(usize::MAX) {
            assert!(s.time >= cutoff);
        }
    }
}

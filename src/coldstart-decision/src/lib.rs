//! Turns a window of samples into a replica count decision.
//!
//! This is a pure computation over its inputs — no I/O, no locking — so
//! that the scaling algorithm itself is trivially unit-testable
//! independent of the scrape loop or the orchestrator adapter. The
//! surrounding [`coldstart-autoscaler`](../coldstart_autoscaler) crate is
//! responsible for reading the window and writing the result back.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use coldstart_types::Sample;

/// The bounds and target this engine scales a single workload against.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    pub min_replicas: u32,
    /// `0` means unbounded above.
    pub max_replicas: u32,
    /// `0` is treated as `1` (one in-flight request per replica), per the
    /// source.
    pub concurrency: u32,
}

/// How long after a forced scale-from-zero the engine refuses to write a
/// smaller replica count than the one currently recorded.
pub const SCALE_FROM_ZERO_GRACE: ChronoDuration = ChronoDuration::minutes(1);

/// The outcome of one decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing should be written: the window was empty, the new value
    /// matches what's already recorded, damping suppressed a scale-down,
    /// or the scale-from-zero grace window is still active.
    NoChange,
    /// `status.computedReplicas` should be set to this value, and
    /// `lastComputed` updated to match.
    Write(u32),
}

/// Clamps `value` into `[min, max]`, treating `max == 0` as "unbounded
/// above."
pub fn bounded(value: u32, min: u32, max: u32) -> u32 {
    let value = value.max(min);
    if max > 0 {
        value.min(max)
    } else {
        value
    }
}

/// Computes the desired replica count from up to the last `recent.len()`
/// samples and decides whether it should be written back.
///
/// `recent` must already be the sub-window the caller wants averaged over
/// (typically the last [`coldstart_window::DEFAULT_RECENT_WINDOW`]
/// samples); this function does not itself truncate.
pub fn decide(
    recent: &[Sample],
    bounds: Bounds,
    last_computed: u32,
    current_computed_replicas: Option<u32>,
    scale_from_zero_timestamp: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Decision {
    if recent.is_empty() {
        return Decision::NoChange;
    }

    let count = recent.len() as f64;
    let avg_active = recent.iter().map(|s| s.active_requests as f64).sum::<f64>() / count;
    let avg_ready = recent.iter().map(|s| s.ready_replicas as f64).sum::<f64>() / count;
    let avg_ready = if avg_ready == 0.0 { 1.0 } else { avg_ready };

    let rate = if bounds.concurrency == 0 {
        1.0
    } else {
        avg_active / bounds.concurrency as f64
    };

    let desired = (avg_ready * rate).ceil() as u32;
    let bounded_value = bounded(desired, bounds.min_replicas, bounds.max_replicas);

    tracing::debug!(
        avg_active,
        avg_ready,
        rate,
        desired,
        bounded = bounded_value,
        "decision cycle"
    );

    // Scale-from-zero grace window: never write a smaller value than what's
    // currently recorded within a minute of the last forced activation.
    if let Some(ts) = scale_from_zero_timestamp {
        if now - ts < SCALE_FROM_ZERO_GRACE {
            if let Some(current) = current_computed_replicas {
                if bounded_value < current {
                    return Decision::NoChange;
                }
            }
        }
    }

    // Scale-down damping: only commit a decrease that clears at least half
    // of the last committed value.
    if bounded_value < last_computed {
        let scale_down = last_computed - bounded_value;
        let threshold = last_computed.div_ceil(2);
        if scale_down < threshold {
            return Decision::NoChange;
        }
    }

    if current_computed_replicas == Some(bounded_value) {
        return Decision::NoChange;
    }

    Decision::Write(bounded_value)
}

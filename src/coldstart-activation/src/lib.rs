//! A concurrent map from activation-signal key to a one-shot readiness
//! rendezvous.
//!
//! The producer is always the endpoint watcher (via [`ActivationSignals::on_change`]
//! / [`ActivationSignals::on_remove`]); consumers are in-flight gateway
//! requests waiting on [`ActivationSignals::wait_for_ready`]. No consumer
//! ever marks a signal ready — only the producer does, and at most once
//! per signal's lifetime.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;

/// The outcome of waiting on an activation signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The signal was already ready, became ready before the timeout, or
    /// no signal was registered for this key at all (nothing to wait on).
    Proceed,
    /// The timeout elapsed before the signal became ready.
    Timeout,
}

struct Signal {
    // A `watch` channel stores its last value rather than delivering a
    // transient wakeup, so a reader always observes a `send` that raced
    // ahead of its `subscribe()` -- unlike `Notify`, there is no window in
    // which a ready transition can be missed by a waiter that hasn't
    // polled yet.
    tx: watch::Sender<bool>,
}

impl Signal {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    fn mark_ready(&self) {
        // No receivers left (every waiter already gave up) is not an error
        // here; there's simply no one to wake.
        let _ = self.tx.send(true);
    }

    async fn wait_ready(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// A concurrent map of pending activation signals, keyed by
/// [`coldstart_types::WorkloadKey::endpoint_key`].
#[derive(Default)]
pub struct ActivationSignals {
    signals: DashMap<String, Arc<Signal>>,
}

impl ActivationSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the endpoint watcher on every observed change to an
    /// endpoint object. If `ready`, the signal (if any is registered) is
    /// marked ready and removed from the map in the same step. If not
    /// ready, ensures a pending entry exists so that waiters have
    /// something to subscribe to.
    pub fn on_change(&self, endpoint_key: &str, ready: bool) {
        if ready {
            if let Some((_, signal)) = self.signals.remove(endpoint_key) {
                signal.mark_ready();
                tracing::debug!(endpoint_key, "activation signal marked ready");
            }
        } else {
            self.signals
                .entry(endpoint_key.to_string())
                .or_insert_with(|| Arc::new(Signal::new()));
        }
    }

    /// Called by the endpoint watcher when the endpoint object is removed.
    /// Deletes the map entry unconditionally. A waiter already subscribed
    /// to the removed signal keeps waiting on its own `Arc` clone and will
    /// only give up via its own timeout; a new waiter arriving after this
    /// call observes the key as absent and proceeds immediately.
    pub fn on_remove(&self, endpoint_key: &str) {
        self.signals.remove(endpoint_key);
    }

    /// Waits for `endpoint_key` to become ready, or for `timeout` to
    /// elapse. An absent key is treated as "nothing to wait for" and
    /// returns [`ActivationOutcome::Proceed`] immediately.
    pub async fn wait_for_ready(&self, endpoint_key: &str, timeout: Duration) -> ActivationOutcome {
        let signal = match self.signals.get(endpoint_key) {
            Some(entry) => Arc::clone(entry.value()),
            None => return ActivationOutcome::Proceed,
        };

        if signal.is_ready() {
            return ActivationOutcome::Proceed;
        }

        match tokio::time::timeout(timeout, signal.wait_ready()).await {
            Ok(()) => ActivationOutcome::Proceed,
            Err(_) => ActivationOutcome::Timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn absent_key_proceeds_immediately() {
        let signals = ActivationSignals::new();
        let outcome = signals.wait_for_ready("api.demo", Duration::from_millis(10)).await;
        assert_eq!(outcome, ActivationOutcome::Proceed);
    }

    #[tokio::test]
    async fn pending_signal_wakes_waiters_on_ready() {
        let signals = Arc::new(ActivationSignals::new());
        signals.on_change("api.demo", false);

        let waiter = {
            let signals = Arc::clone(&signals);
            tokio::spawn(async move {
                signals.wait_for_ready("api.demo", Duration::from_secs(5)).await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        signals.on_change("api.demo", true);

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, ActivationOutcome::Proceed);
    }

    #[tokio::test]
    async fn pending_signal_times_out_if_never_ready() {
        let signals = ActivationSignals::new();
        signals.on_change("api.demo", false);
        let outcome = signals.wait_for_ready("api.demo", Duration::from_millis(20)).await;
        assert_eq!(outcome, ActivationOutcome::Timeout);
    }

    #[tokio::test]
    async fn removal_while_waiting_does_not_wake_the_waiter_early() {
        let signals = Arc::new(ActivationSignals::new());
        signals.on_change("api.demo", false);

        let waiter = {
            let signals = Arc::clone(&signals);
            tokio::spawn(async move {
                signals.wait_for_ready("api.demo", Duration::from_millis(50)).await
            })
        };

        tokio::time::sleep(Duration::from_millis(5)).await;
        signals.on_remove("api.demo");

        // The waiter holds its own Arc clone and only gives up via its own
        // timeout, not because the map entry disappeared.
        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, ActivationOutcome::Timeout);
    }

    #[tokio::test]
    async fn a_request_arriving_after_removal_proceeds_immediately() {
        let signals = ActivationSignals::new();
        signals.on_change("api.demo", false);
        signals.on_remove("api.demo");
        let outcome = signals.wait_for_ready("api.demo", Duration::from_millis(10)).await;
        assert_eq!(outcome, ActivationOutcome::Proceed);
    }

    #[tokio::test]
    async fn ready_twice_does_not_panic_and_only_wakes_once() {
        let signals = ActivationSignals::new();
        signals.on_change("api.demo", false);
        signals.on_change("api.demo", true);
        signals.on_change("api.demo", true); // no entry left; no-op
        let outcome = signals.wait_for_ready("api.demo", Duration::from_millis(10)).await;
        assert_eq!(outcome, ActivationOutcome::Proceed); // absent now, so "proceed"
    }
}

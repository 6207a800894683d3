//! Exponential backoff schedules.
//!
//! A small, allocation-free schedule of delays: a starting delay that
//! grows by a constant factor for a bounded number of steps.

use std::time::Duration;

/// A bounded exponential backoff schedule.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    /// The delay before the first retry.
    pub initial: Duration,
    /// The multiplicative growth factor applied after each step.
    pub factor: f64,
    /// The maximum number of delays this schedule will yield.
    pub steps: u32,
}

impl Backoff {
    /// Returns an iterator over the delays in this schedule, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.steps).map(move |step| {
            let factor = self.factor.powi(step as i32);
            self.initial.mul_f64(factor)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_delay_is_unscaled() {
        let b = Backoff {
            initial: Duration::from_millis(100),
            factor: 1.3,
            steps: 18,
        };
        let mut delays = b.delays();
        assert_eq!(delays.next(), Some(Duration::from_millis(100)));
        assert_eq!(delays.next(), Some(Duration::from_millis(130)));
    }

    #[test]
    fn yields_exactly_steps_delays() {
        let b = Backoff {
            initial: Duration::from_millis(100),
            factor: 1.3,
            steps: 18,
        };
        assert_eq!(b.delays().count(), 18);
    }

    #[test]
    fn schedule_sums_to_tens_of_seconds() {
        let b = Backoff {
            initial: Duration::from_millis(100),
            factor: 1.3,
            steps: 18,
        };
        let total: Duration = b.delays().sum();
        assert!(total.as_secs_f64() > 30.0 && total.as_secs_f64() < 45.0);
    }
}

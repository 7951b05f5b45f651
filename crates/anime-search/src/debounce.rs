//! Input debouncing.
//!
//! A `Debouncer` holds the latest settled value of a rapidly changing input.
//! A new input only becomes the settled value once no further change has
//! arrived for the configured delay. It does not own a timer: callers feed it
//! the current time (from a `Clock`) and ask for the deadline when they need
//! to schedule a wake-up.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    /// Value most recently let through
    settled: T,
    /// Value most recently pushed
    latest: T,
    /// When `latest` settles, if a change is pending
    deadline: Option<Instant>,
    disposed: bool,
}

impl<T: Clone + PartialEq> Debouncer<T> {
    /// The initial value is settled immediately, without waiting
    pub fn new(initial: T, delay: Duration) -> Self {
        Self {
            delay,
            settled: initial.clone(),
            latest: initial,
            deadline: None,
            disposed: false,
        }
    }

    /// Record a new input value, restarting the quiet period
    pub fn push(&mut self, value: T, now: Instant) {
        if self.disposed || value == self.latest {
            return;
        }
        self.latest = value;
        self.deadline = Some(now + self.delay);
    }

    /// Settle the pending value if its quiet period has elapsed
    ///
    /// Returns the new settled value only when it differs from the previous
    /// one; intermediate inputs that were overwritten are never returned.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                if self.latest == self.settled {
                    None
                } else {
                    self.settled = self.latest.clone();
                    Some(self.settled.clone())
                }
            }
            _ => None,
        }
    }

    /// Latest settled value
    pub fn value(&self) -> &T {
        &self.settled
    }

    /// When the pending value will settle, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Drop any pending value and ignore further input
    pub fn dispose(&mut self) {
        self.deadline = None;
        self.latest = self.settled.clone();
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{Clock, ManualClock};

    const DELAY: Duration = Duration::from_millis(250);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_initial_value_is_immediate() {
        let debouncer = Debouncer::new("test".to_string(), DELAY);
        assert_eq!(debouncer.value(), "test");
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_value_settles_after_delay() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new("initial".to_string(), DELAY);

        debouncer.push("updated".to_string(), clock.now());
        clock.advance(ms(249));
        assert_eq!(debouncer.poll(clock.now()), None);
        assert_eq!(debouncer.value(), "initial");

        clock.advance(ms(1));
        assert_eq!(debouncer.poll(clock.now()), Some("updated".to_string()));
        assert_eq!(debouncer.value(), "updated");
    }

    #[test]
    fn test_only_last_value_survives() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new("initial".to_string(), DELAY);

        debouncer.push("update1".to_string(), clock.now());
        clock.advance(ms(100));
        assert_eq!(debouncer.poll(clock.now()), None);

        debouncer.push("update2".to_string(), clock.now());
        clock.advance(ms(100));
        assert_eq!(debouncer.poll(clock.now()), None);

        debouncer.push("final".to_string(), clock.now());
        clock.advance(ms(200));
        // 400ms since the first change, but only 200ms of quiet
        assert_eq!(debouncer.poll(clock.now()), None);

        clock.advance(ms(50));
        assert_eq!(debouncer.poll(clock.now()), Some("final".to_string()));
        assert_eq!(debouncer.poll(clock.now()), None);
    }

    #[test]
    fn test_returning_to_settled_value_emits_nothing() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new("naruto".to_string(), DELAY);

        debouncer.push("narut".to_string(), clock.now());
        clock.advance(ms(50));
        debouncer.push("naruto".to_string(), clock.now());
        clock.advance(DELAY);

        assert_eq!(debouncer.poll(clock.now()), None);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_repeated_push_keeps_deadline() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(String::new(), DELAY);

        debouncer.push("bleach".to_string(), clock.now());
        let deadline = debouncer.deadline();
        clock.advance(ms(100));
        debouncer.push("bleach".to_string(), clock.now());

        assert_eq!(debouncer.deadline(), deadline);
    }

    #[test]
    fn test_different_delay_values() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new("test".to_string(), ms(500));

        debouncer.push("changed".to_string(), clock.now());
        clock.advance(ms(250));
        assert_eq!(debouncer.poll(clock.now()), None);

        clock.advance(ms(250));
        assert_eq!(debouncer.poll(clock.now()), Some("changed".to_string()));
    }

    #[test]
    fn test_dispose_drops_pending_value() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new("initial".to_string(), DELAY);

        debouncer.push("pending".to_string(), clock.now());
        debouncer.dispose();
        clock.advance(DELAY);

        assert_eq!(debouncer.poll(clock.now()), None);
        assert_eq!(debouncer.value(), "initial");

        debouncer.push("ignored".to_string(), clock.now());
        assert!(!debouncer.is_pending());
    }
}

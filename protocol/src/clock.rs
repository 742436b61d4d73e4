//! # Clock
//!
//! The registry stamps every registration with the current time. Time is a
//! collaborator rather than a direct `Utc::now()` call so that replay and
//! tests can pin it, and so that the registry never observes time running
//! backwards.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

/// Timestamp type used across the protocol.
pub type Timestamp = DateTime<Utc>;

/// Supplies monotonically non-decreasing timestamps.
pub trait Clock {
    /// Returns the current time. Successive calls never go backwards.
    fn now(&self) -> Timestamp;
}

impl<T: Clock + ?Sized> Clock for Rc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

impl<T: Clock + ?Sized> Clock for Box<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Wall clock, clamped so that an NTP step backwards is reported as the
/// last observed time instead of an earlier one.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Cell<Option<Timestamp>>,
}

impl SystemClock {
    /// Creates a new system clock.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = Utc::now();
        let now = match self.last.get() {
            Some(last) if last > wall => last,
            _ => wall,
        };
        self.last.set(Some(now));
        now
    }
}

/// Manually driven clock for tests and deterministic replay.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<Timestamp>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Creates a clock frozen at the given Unix timestamp (seconds).
    /// Out-of-range values fall back to the Unix epoch.
    pub fn at_unix(secs: i64) -> Self {
        Self::new(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }

    /// Moves the clock forward. Negative durations are ignored so the clock
    /// stays non-decreasing.
    pub fn advance(&self, by: Duration) {
        if by > Duration::zero() {
            self.now.set(self.now.get() + by);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_never_goes_backwards() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn system_clock_clamps_to_last_observed() {
        let clock = SystemClock::new();
        let future = Utc::now() + Duration::hours(1);
        clock.last.set(Some(future));
        assert_eq!(clock.now(), future);
    }

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::at_unix(1_700_000_000);
        let start = clock.now();
        clock.advance(Duration::seconds(30));
        assert_eq!(clock.now() - start, Duration::seconds(30));
    }

    #[test]
    fn manual_clock_ignores_negative_advance() {
        let clock = ManualClock::at_unix(1_700_000_000);
        let start = clock.now();
        clock.advance(Duration::seconds(-30));
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn shared_clock_delegates() {
        let clock = Rc::new(ManualClock::at_unix(42));
        let shared: Box<dyn Clock> = Box::new(Rc::clone(&clock));
        clock.advance(Duration::seconds(1));
        assert_eq!(shared.now().timestamp(), 43);
    }
}

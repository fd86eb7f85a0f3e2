//! Clock abstraction for deadlines and OSD disqualification windows.
//!
//! Mirrors the `Environment` trait pattern: the short path needs the
//! same thing — a way to drive time-dependent behavior (here, "is this OSD
//! still disqualified?" and "has this request exceeded its deadline?")
//! deterministically in tests, without racing `tokio::time::pause` against
//! concurrently-dispatched per-OSD tasks.

use std::time::{Duration, Instant};

/// Monotonic clock used for timeouts and disqualification deadlines.
///
/// # Invariants
///
/// `now()` never goes backwards within a process.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Current monotonic instant.
    fn now(&self) -> Instant;
}

/// Production clock backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A deadline computed from a clock and a timeout, used for both OSD I/O
/// deadlines and OSD disqualification windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    #[must_use]
    pub fn after(clock: &impl Clock, duration: Duration) -> Self {
        Self(clock.now() + duration)
    }

    #[must_use]
    pub fn is_expired(&self, clock: &impl Clock) -> bool {
        clock.now() >= self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct ManualClock(Arc<Mutex<Instant>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(Instant::now())))
        }

        #[allow(clippy::unwrap_used)]
        fn advance(&self, d: Duration) {
            let mut guard = self.0.lock().unwrap();
            *guard += d;
        }
    }

    impl Clock for ManualClock {
        #[allow(clippy::unwrap_used)]
        fn now(&self) -> Instant {
            *self.0.lock().unwrap()
        }
    }

    #[test]
    fn deadline_expires_after_duration_elapses() {
        let clock = ManualClock::new();
        let deadline = Deadline::after(&clock, Duration::from_secs(30));

        assert!(!deadline.is_expired(&clock));

        clock.advance(Duration::from_secs(29));
        assert!(!deadline.is_expired(&clock));

        clock.advance(Duration::from_secs(1));
        assert!(deadline.is_expired(&clock));
    }

    #[test]
    fn system_clock_advances() {
        let clock = SystemClock;
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = clock.now();
        assert!(t2 > t1);
    }
}

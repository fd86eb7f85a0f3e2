//! Shared deterministic [`Clock`] for integration tests.
//!
//! Every crate that needs to assert on disqualification windows
//! (`shortpath-core`, `shortpath-osd`, `shortpath-client`) has its own
//! private copy of this for unit tests; this one is the public version
//! scenario tests reach for when they need to hold several crates' clocks
//! in sync.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use shortpath_core::Clock;

/// A clock whose `now()` only changes when [`ManualClock::advance`] is
/// called, shared by clone so a test and a client under test observe the
/// same time.
#[derive(Clone)]
pub struct ManualClock(Arc<Mutex<Instant>>);

impl ManualClock {
    /// A clock starting at the real current instant.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(Instant::now())))
    }

    /// Move this clock's `now()` forward by `duration`.
    pub fn advance(&self, duration: Duration) {
        *self.0.lock() += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.0.lock()
    }
}

//! General time utility functions
//!
//! Controllers never read the system clock directly, instead they are handed
//! a [`Clock`] so that the time between two events can be driven by a
//! [`MockClock`] in tests.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A monotonic source of time.
pub trait Clock {
    /// Seconds elapsed since some fixed, arbitrary, point in the past.
    ///
    /// Successive calls never return a smaller value.
    fn now_s(&self) -> f64;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A clock backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

/// A manually advanced clock.
///
/// Clones share the same time, so a test can keep one handle and give the
/// other to the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    now_s: Rc<Cell<f64>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_s(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

impl MockClock {
    /// Create a new clock reading zero seconds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by the given number of seconds.
    ///
    /// Negative steps are ignored to keep the clock monotonic.
    pub fn advance(&self, dt_s: f64) {
        if dt_s > 0.0 {
            self.now_s.set(self.now_s.get() + dt_s);
        }
    }
}

impl Clock for MockClock {
    fn now_s(&self) -> f64 {
        self.now_s.get()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

//! Time source used for expiry decisions.

use std::time::Instant;

/// Monotonic time source.
///
/// Storage TTLs and the node cache read the current instant through this trait
/// so tests can advance time without sleeping.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

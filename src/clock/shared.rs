/*!
 * Shared Simulated Clock
 *
 * One logical clock shared by the controller and every worker. Writers
 * serialize on a single-permit semaphore; readers take consistent
 * (seconds, nanoseconds) snapshots through a seqlock without blocking.
 */

use super::types::{ClockError, ClockResult, SimTime};
use crate::core::types::Nanos;
use seqlock::SeqLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::debug;

/// Shared logical clock
pub struct SimClock {
    // Counting mutual-exclusion guard, initial value 1
    guard: Semaphore,
    time: SeqLock<SimTime>,
    released: AtomicBool,
}

impl SimClock {
    pub fn new() -> Self {
        Self::starting_at(SimTime::ZERO)
    }

    pub fn starting_at(start: SimTime) -> Self {
        Self {
            guard: Semaphore::new(1),
            time: SeqLock::new(start),
            released: AtomicBool::new(false),
        }
    }

    /// Consistent snapshot of the current time
    #[inline]
    pub fn read(&self) -> SimTime {
        self.time.read()
    }

    /// Acquire the guard for a read-modify-write critical section
    pub async fn enter(&self) -> ClockResult<ClockGuard<'_>> {
        let permit = self.guard.acquire().await.map_err(|_| ClockError::Closed)?;
        Ok(ClockGuard {
            clock: self,
            _permit: permit,
        })
    }

    /// Add `delta` nanoseconds under the guard and return the new time
    pub async fn advance(&self, delta: Nanos) -> ClockResult<SimTime> {
        let mut guard = self.enter().await?;
        Ok(guard.advance(delta))
    }

    /// Move the clock forward to `target`; never moves it backwards
    pub async fn advance_to(&self, target: SimTime) -> ClockResult<SimTime> {
        let mut guard = self.enter().await?;
        Ok(guard.advance_to(target))
    }

    /// Release the clock. Wakes every waiter with `ClockError::Closed`.
    pub fn release(&self) -> ClockResult<()> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Err(ClockError::AlreadyReleased);
        }
        self.guard.close();
        debug!(at = %self.read(), "Simulated clock released");
        Ok(())
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Held permit on the clock guard
///
/// Dropping the guard releases the permit.
pub struct ClockGuard<'a> {
    clock: &'a SimClock,
    _permit: SemaphorePermit<'a>,
}

impl ClockGuard<'_> {
    pub fn advance(&mut self, delta: Nanos) -> SimTime {
        let mut time = self.clock.time.lock_write();
        *time = time.add_nanos(delta);
        *time
    }

    pub fn advance_to(&mut self, target: SimTime) -> SimTime {
        let mut time = self.clock.time.lock_write();
        if target > *time {
            *time = target;
        }
        *time
    }
}

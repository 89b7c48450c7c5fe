/*!
 * ID Generation System
 * Type-safe process and slot identifiers with a recycling slot pool
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

// ============================================================================
// Type-Safe ID Wrappers
// ============================================================================

/// Simulated process ID (never reused within a run)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pid(pub u32);

/// Position in the bounded concurrency pool (reused after reaping)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl SlotId {
    /// Index into slot-sized tables
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Pid Generator
// ============================================================================

/// Atomic counter for process IDs
///
/// Cache-line aligned; clones share the same counter.
#[repr(C, align(64))]
pub struct PidGenerator {
    counter: Arc<AtomicU32>,
}

impl PidGenerator {
    /// Create new generator starting at given value
    #[inline]
    pub fn new(start: u32) -> Self {
        Self {
            counter: Arc::new(AtomicU32::new(start)),
        }
    }

    #[inline]
    pub fn next(&self) -> Pid {
        Pid(self.counter.fetch_add(1, Ordering::SeqCst))
    }

    /// Next value that would be handed out (for debugging)
    #[inline]
    pub fn current(&self) -> Pid {
        Pid(self.counter.load(Ordering::Relaxed))
    }
}

impl Default for PidGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Clone for PidGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: Arc::clone(&self.counter),
        }
    }
}

// ============================================================================
// Slot Pool
// ============================================================================

/// Bounded pool of slot ids
///
/// Always hands out the lowest free slot so reuse is deterministic. Owned by
/// the controller only, so no interior synchronization.
#[derive(Debug, Clone)]
pub struct SlotPool {
    capacity: usize,
    free: BTreeSet<SlotId>,
}

impl SlotPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            free: (0..capacity as u32).map(SlotId).collect(),
        }
    }

    /// Take the lowest free slot, if any
    pub fn acquire(&mut self) -> Option<SlotId> {
        let slot = *self.free.iter().next()?;
        self.free.remove(&slot);
        Some(slot)
    }

    /// Return a slot to the pool. Returns false for out-of-range or already free slots.
    pub fn release(&mut self, slot: SlotId) -> bool {
        if slot.index() >= self.capacity {
            return false;
        }
        self.free.insert(slot)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.free.len()
    }

    pub fn is_free(&self, slot: SlotId) -> bool {
        self.free.contains(&slot)
    }
}

// ============================================================================
// Tests
// ============================================================================

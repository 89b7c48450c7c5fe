/*!
 * Shared Context
 *
 * The process-wide state shared by the controller and its workers: the
 * simulated clock, the resource table and the message channel.
 *
 * Created in the order clock, table, channel. Torn down in the reverse
 * order channel, table, clock, exactly once. Closing the channel first stops
 * workers from sending; releasing the clock last wakes anything still
 * parked on the clock guard.
 */

use crate::clock::{SimClock, SimTime};
use crate::core::config::SimConfig;
use crate::core::errors::{Result, SimError};
use crate::core::id::SlotId;
use crate::ipc::MessageChannel;
use crate::resources::ResourceTable;
use parking_lot::RwLock;
use rand::Rng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What teardown removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    /// Shared objects removed, in removal order
    pub removed: Vec<&'static str>,
    /// Slots whose entries were still in the table
    pub reclaimed_slots: Vec<SlotId>,
    pub final_time: SimTime,
}

pub struct SharedContext {
    clock: Arc<SimClock>,
    table: Arc<RwLock<ResourceTable>>,
    channel: Arc<MessageChannel>,
    torn_down: AtomicBool,
}

impl SharedContext {
    /// Create the shared state for one run
    pub fn create<R: Rng + ?Sized>(config: &SimConfig, rng: &mut R) -> Result<Self> {
        let clock = Arc::new(SimClock::new());
        debug!("Simulated clock created");
        Self::with_clock(clock, config, rng)
    }

    /// Build the rest of the context around an existing clock. The clock is
    /// released if a later step fails.
    fn with_clock<R: Rng + ?Sized>(
        clock: Arc<SimClock>,
        config: &SimConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let table = match ResourceTable::random(config.resource_count, config.max_concurrent, rng)
        {
            Ok(table) => table,
            Err(e) => {
                release_clock(&clock);
                return Err(SimError::resource_init("resource table", e.to_string()));
            }
        };
        debug!(total = ?table.total(), "Resource table created");
        let table = Arc::new(RwLock::new(table));

        let channel = Arc::new(MessageChannel::new());
        debug!("Message channel created");

        Ok(Self {
            clock,
            table,
            channel,
            torn_down: AtomicBool::new(false),
        })
    }

    /// Wrap existing parts; used by tests that need a specific table
    pub fn from_parts(clock: SimClock, table: ResourceTable, channel: MessageChannel) -> Self {
        Self {
            clock: Arc::new(clock),
            table: Arc::new(RwLock::new(table)),
            channel: Arc::new(channel),
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn clock(&self) -> &Arc<SimClock> {
        &self.clock
    }

    pub fn table(&self) -> &Arc<RwLock<ResourceTable>> {
        &self.table
    }

    pub fn channel(&self) -> &Arc<MessageChannel> {
        &self.channel
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Remove all shared state. Returns `None` if already torn down.
    pub fn teardown(&self) -> Option<TeardownReport> {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return None;
        }

        let mut removed = Vec::with_capacity(3);

        match self.channel.release() {
            Ok(()) => removed.push("message channel"),
            Err(e) => warn!(error = %e, "Message channel release failed"),
        }

        let reclaimed_slots = match self.table.write().release_all() {
            Ok(slots) => {
                removed.push("resource table");
                slots
            }
            Err(e) => {
                warn!(error = %e, "Resource table release failed");
                Vec::new()
            }
        };

        let final_time = self.clock.read();
        if release_clock(&self.clock) {
            removed.push("simulated clock");
        }

        info!(
            removed = ?removed,
            reclaimed = reclaimed_slots.len(),
            final_time = %final_time,
            "Shared state torn down"
        );

        Some(TeardownReport {
            removed,
            reclaimed_slots,
            final_time,
        })
    }
}

impl Drop for SharedContext {
    fn drop(&mut self) {
        if !self.is_torn_down() {
            let _ = self.teardown();
        }
    }
}

fn release_clock(clock: &SimClock) -> bool {
    match clock.release() {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Simulated clock release failed");
            false
        }
    }
}

/*!
 * Simulation Event Log
 *
 * Events the controller emits during a run. Sinks decide where they go: a
 * buffered log file for the binary, an in-memory list for tests. Every event
 * is mirrored to tracing as well.
 */

use crate::clock::SimTime;
use crate::core::id::{Pid, SlotId};
use crate::core::types::{ResourceIndex, ResourceVec};
use crate::process::WorkerExit;
use crate::resources::DeferReason;
use crate::scheduler::RunSummary;
use crate::signals::ShutdownReason;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// What the controller decided about one resource message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceDecision {
    Granted,
    Deferred(DeferReason),
    Released,
    Rejected(String),
}

/// One entry of the simulation log
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    Spawned {
        pid: Pid,
        slot: SlotId,
        at: SimTime,
        max_claim: ResourceVec,
    },
    Decision {
        pid: Pid,
        slot: SlotId,
        resource: ResourceIndex,
        decision: ResourceDecision,
        at: SimTime,
    },
    Terminated {
        pid: Pid,
        slot: SlotId,
        at: SimTime,
        work_done_ns: u64,
        returned: ResourceVec,
    },
    ShutdownStarted {
        reason: ShutdownReason,
        at: SimTime,
        live: usize,
    },
    Reaped {
        pid: Pid,
        slot: SlotId,
        exit: WorkerExit,
    },
    RunFinished(RunSummary),
}

impl fmt::Display for SimEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimEvent::Spawned {
                pid, slot, at, max_claim,
            } => write!(
                f,
                "Master: Creating child process {} in slot {} at my time {} (max claim {:?})",
                pid, slot, at, max_claim
            ),
            SimEvent::Decision {
                pid,
                slot,
                resource,
                decision,
                at,
            } => match decision {
                ResourceDecision::Granted => write!(
                    f,
                    "Master: Granting P{} (pid {}) request for R{} at time {}",
                    slot, pid, resource, at
                ),
                ResourceDecision::Deferred(reason) => write!(
                    f,
                    "Master: Deferring P{} (pid {}) request for R{} at time {}: {}",
                    slot, pid, resource, at, reason
                ),
                ResourceDecision::Released => write!(
                    f,
                    "Master: Acknowledging P{} (pid {}) releasing R{} at time {}",
                    slot, pid, resource, at
                ),
                ResourceDecision::Rejected(reason) => write!(
                    f,
                    "Master: Rejecting P{} (pid {}) message about R{} at time {}: {}",
                    slot, pid, resource, at, reason
                ),
            },
            SimEvent::Terminated {
                pid,
                slot,
                at,
                work_done_ns,
                returned,
            } => write!(
                f,
                "Master: Child {} in slot {} terminating at my time {} after {} ns of work, returning {:?}",
                pid, slot, at, work_done_ns, returned
            ),
            SimEvent::ShutdownStarted { reason, at, live } => write!(
                f,
                "Master: Shutting down at my time {} ({}), {} children still live",
                at, reason, live
            ),
            SimEvent::Reaped { pid, slot, exit } => write!(
                f,
                "Master: Reaped child {} from slot {} ({})",
                pid, slot, exit
            ),
            SimEvent::RunFinished(summary) => write!(
                f,
                "Master: Run finished at {} ({}): {} spawned, {} terminated, {} forced, {} grants, {} deferrals",
                summary.final_time,
                summary.reason,
                summary.total_spawned,
                summary.total_terminated,
                summary.forced_terminations,
                summary.grants,
                summary.deferrals
            ),
        }
    }
}

/// Destination for simulation events
pub trait EventSink: Send + Sync {
    fn record(&self, event: &SimEvent);

    fn flush(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Buffered log file, one line per event
pub struct FileSink {
    writer: Mutex<BufWriter<File>>,
}

impl FileSink {
    /// Create (or truncate) the log file
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }
}

impl EventSink for FileSink {
    fn record(&self, event: &SimEvent) {
        if let Err(e) = writeln!(self.writer.lock(), "{}", event) {
            warn!(error = %e, "Failed to write simulation log line");
        }
    }

    fn flush(&self) -> io::Result<()> {
        self.writer.lock().flush()
    }
}

/// Keeps every event in memory
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<SimEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.events.lock().clone()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &SimEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Fans events out to a sink and to tracing
#[derive(Clone)]
pub struct EventLog {
    sink: Arc<dyn EventSink>,
}

impl EventLog {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    pub fn emit(&self, event: SimEvent) {
        match &event {
            SimEvent::Spawned { pid, slot, at, .. } => {
                info!(pid = %pid, slot = %slot, at = %at, "process spawned")
            }
            SimEvent::Decision {
                slot,
                resource,
                decision,
                ..
            } => tracing::debug!(slot = %slot, resource, decision = ?decision, "resource decision"),
            SimEvent::Terminated {
                pid,
                slot,
                at,
                work_done_ns,
                ..
            } => info!(pid = %pid, slot = %slot, at = %at, work_done_ns, "process terminated"),
            SimEvent::ShutdownStarted { reason, at, live } => {
                info!(reason = %reason, at = %at, live, "shutdown started")
            }
            SimEvent::Reaped { pid, slot, exit } => {
                tracing::debug!(pid = %pid, slot = %slot, exit = %exit, "process reaped")
            }
            SimEvent::RunFinished(summary) => info!(summary = ?summary, "run finished"),
        }
        self.sink.record(&event);
    }

    pub fn flush(&self) -> io::Result<()> {
        self.sink.flush()
    }
}

/*!
 * Controller
 *
 * The single writer of the resource table. Spawns workers on the spawn
 * timer, serializes every resource decision, re-evaluates deferred requests
 * when capacity comes back and drives global shutdown.
 *
 * Loop: wait for the next inbound message, the shutdown signal or a short
 * polling tick, whichever comes first. Spawning and reaping run between
 * wake-ups.
 */

use super::spawn::SpawnTimer;
use super::types::{RunStats, RunSummary};
use crate::clock::{SimClock, SimTime};
use crate::context::SharedContext;
use crate::core::config::SimConfig;
use crate::core::errors::{Result, SimError};
use crate::core::id::{Pid, PidGenerator, SlotId, SlotPool};
use crate::core::limits::{CONTROLLER_POLL_INTERVAL, REAP_POLL_INTERVAL, SPAWN_OVERHEAD_NS};
use crate::core::types::{ResourceIndex, ResourceVec};
use crate::ipc::{ControllerInbox, Envelope, IpcError, MessageChannel, MessageKind, Reply};
use crate::monitoring::{EventLog, ResourceDecision, SimEvent};
use crate::process::{Worker, WorkerConfig, WorkerExit};
use crate::resources::{Decision, ResourceTable};
use crate::signals::{ShutdownReason, ShutdownSignal};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// A spawned worker the controller still tracks
struct LiveWorker {
    pid: Pid,
    handle: JoinHandle<WorkerExit>,
}

/// A worker whose TERMINATE was acknowledged but whose task has not been reaped
struct ExitingWorker {
    pid: Pid,
    slot: SlotId,
    handle: JoinHandle<WorkerExit>,
}

pub struct Scheduler {
    config: SimConfig,
    worker_config: WorkerConfig,
    context: SharedContext,
    clock: Arc<SimClock>,
    table: Arc<RwLock<ResourceTable>>,
    channel: Arc<MessageChannel>,
    inbox: ControllerInbox,
    shutdown: ShutdownSignal,
    events: EventLog,
    slots: SlotPool,
    pids: PidGenerator,
    spawn_timer: SpawnTimer,
    live: BTreeMap<SlotId, LiveWorker>,
    exiting: Vec<ExitingWorker>,
    /// At most one pending request per slot, re-evaluated in slot order
    deferred: BTreeMap<SlotId, ResourceIndex>,
    rng: StdRng,
    stats: RunStats,
}

impl Scheduler {
    pub fn new(
        config: SimConfig,
        context: SharedContext,
        shutdown: ShutdownSignal,
        events: EventLog,
        rng: StdRng,
    ) -> Result<Self> {
        let inbox = context.channel().take_inbox()?;
        Ok(Self {
            worker_config: WorkerConfig::from(&config),
            clock: Arc::clone(context.clock()),
            table: Arc::clone(context.table()),
            channel: Arc::clone(context.channel()),
            inbox,
            shutdown,
            events,
            slots: SlotPool::new(config.max_concurrent),
            pids: PidGenerator::default(),
            spawn_timer: SpawnTimer::new(config.spawn_window_ns, config.max_total_spawns),
            live: BTreeMap::new(),
            exiting: Vec::new(),
            deferred: BTreeMap::new(),
            rng,
            stats: RunStats::default(),
            config,
            context,
        })
    }

    /// Read access to the resource table for observers
    pub fn table(&self) -> Arc<RwLock<ResourceTable>> {
        Arc::clone(&self.table)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Run until shutdown, then reap every worker and tear the context down
    pub async fn run(mut self) -> RunSummary {
        info!(
            max_concurrent = self.config.max_concurrent,
            resources = self.table.read().resource_count(),
            sim_end = %self.config.sim_end,
            "Controller started"
        );

        let mut fatal = None;
        let reason = match self.main_loop().await {
            Ok(reason) => reason,
            Err(e) => {
                let reason = match e {
                    SimError::Ipc(_) => ShutdownReason::IpcFailure,
                    _ => ShutdownReason::Fault,
                };
                error!(error = %e, "Controller failed");
                self.shutdown.trigger(reason);
                fatal = Some(e.to_string());
                // A reason set first by an external source still wins
                self.shutdown.reason().unwrap_or(reason)
            }
        };

        self.shutdown_workers(reason).await;

        let final_time = self.clock.read();
        debug!(stats = ?self.channel.stats(), "Channel counters at shutdown");
        let teardown = self.context.teardown();
        let summary = RunSummary::new(reason, &self.stats, final_time, teardown, fatal);

        self.events.emit(SimEvent::RunFinished(summary.clone()));
        if let Err(e) = self.events.flush() {
            warn!(error = %e, "Failed to flush simulation log");
        }
        summary
    }

    async fn main_loop(&mut self) -> Result<ShutdownReason> {
        let mut tick = tokio::time::interval(CONTROLLER_POLL_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if let Some(reason) = self.shutdown.reason() {
                return Ok(reason);
            }

            self.reap_exited().await?;

            let now = self.clock.read();
            if now >= self.config.sim_end {
                self.shutdown.trigger(ShutdownReason::SimEndReached);
                continue;
            }

            if self.spawn_timer.is_due(now) && self.live.len() < self.config.max_concurrent {
                self.spawn(now).await?;
                continue;
            }

            if self.live.is_empty() && self.exiting.is_empty() {
                self.idle_jump().await?;
                continue;
            }

            tokio::select! {
                reason = self.shutdown.wait() => return Ok(reason),
                message = self.inbox.recv() => match message {
                    Some(Ok(envelope)) => self.dispatch(envelope)?,
                    Some(Err(e)) => return Err(e.into()),
                    None => return Err(IpcError::Closed("controller inbox closed".into()).into()),
                },
                _ = tick.tick() => {}
            }
        }
    }

    /// With no live worker nothing else moves the clock: jump to the next
    /// spawn instant, or to the end when no spawn is left
    async fn idle_jump(&mut self) -> Result<()> {
        let target = self
            .spawn_timer
            .next()
            .map_or(self.config.sim_end, |next| next.min(self.config.sim_end));
        let now = self.clock.advance_to(target).await?;
        debug!(now = %now, "Idle, clock advanced");
        Ok(())
    }

    // ========================================================================
    // Spawning
    // ========================================================================

    async fn spawn(&mut self, now: SimTime) -> Result<()> {
        let Some(slot) = self.slots.acquire() else {
            return Ok(());
        };
        let pid = self.pids.next();

        let claim: ResourceVec = (0..self.table.read().resource_count())
            .map(|_| self.rng.gen_range(0..self.config.max_claim_bound))
            .collect();
        let max_claim = self.table.write().admit(slot, claim)?.max_claim.clone();

        let endpoint = self.channel.register(pid, slot)?;
        let worker = Worker::new(
            endpoint,
            Arc::clone(&self.clock),
            self.worker_config,
            max_claim.clone(),
            self.rng.gen(),
        );
        let handle = tokio::spawn(worker.run());
        self.live.insert(slot, LiveWorker { pid, handle });

        self.stats.total_spawned += 1;
        self.stats.peak_live = self.stats.peak_live.max(self.live.len());
        self.spawn_timer.spawned(now, &mut self.rng);

        self.events.emit(SimEvent::Spawned {
            pid,
            slot,
            at: now,
            max_claim,
        });

        self.clock.advance(SPAWN_OVERHEAD_NS).await?;
        Ok(())
    }

    // ========================================================================
    // Message handling
    // ========================================================================

    fn dispatch(&mut self, envelope: Envelope) -> Result<()> {
        let Envelope {
            sender_pid: pid,
            sender_slot: slot,
            kind,
        } = envelope;

        if self.live.get(&slot).map(|w| w.pid) != Some(pid) {
            let resource = match kind {
                MessageKind::Request { resource } | MessageKind::Release { resource } => resource,
                MessageKind::Terminate { .. } => 0,
            };
            return self.reject(pid, slot, resource, "sender is not a live process".into());
        }

        match kind {
            MessageKind::Request { resource } => self.handle_request(pid, slot, resource),
            MessageKind::Release { resource } => self.handle_release(pid, slot, resource),
            MessageKind::Terminate { work_done_ns } => self.handle_terminate(pid, slot, work_done_ns),
        }
    }

    fn handle_request(&mut self, pid: Pid, slot: SlotId, resource: ResourceIndex) -> Result<()> {
        if self.deferred.contains_key(&slot) {
            return self.reject(pid, slot, resource, "a request is already pending".into());
        }

        let decision = self.table.write().request(slot, resource);
        match decision {
            Ok(Decision::Granted) => self.grant(pid, slot, resource),
            Ok(Decision::Deferred(reason)) => {
                self.deferred.insert(slot, resource);
                self.stats.deferrals += 1;
                self.emit_decision(pid, slot, resource, ResourceDecision::Deferred(reason));
                Ok(())
            }
            Err(e) => self.reject(pid, slot, resource, e.to_string()),
        }
    }

    fn handle_release(&mut self, pid: Pid, slot: SlotId, resource: ResourceIndex) -> Result<()> {
        let released = self.table.write().release(slot, resource);
        if let Err(e) = released {
            return self.reject(pid, slot, resource, e.to_string());
        }
        self.check_invariants()?;

        self.stats.releases += 1;
        self.emit_decision(pid, slot, resource, ResourceDecision::Released);
        self.send_reply(slot, &Reply::Released { resource })?;
        self.retry_deferred()
    }

    fn handle_terminate(&mut self, pid: Pid, slot: SlotId, work_done_ns: u64) -> Result<()> {
        let returned = self.table.write().reclaim(slot)?;
        self.deferred.remove(&slot);
        self.check_invariants()?;

        self.send_reply(
            slot,
            &Reply::Acknowledged {
                returned: returned.clone(),
            },
        )?;
        self.channel.unregister(slot);
        self.slots.release(slot);

        if let Some(worker) = self.live.remove(&slot) {
            self.exiting.push(ExitingWorker {
                pid,
                slot,
                handle: worker.handle,
            });
        }
        self.stats.total_terminated += 1;

        self.events.emit(SimEvent::Terminated {
            pid,
            slot,
            at: self.clock.read(),
            work_done_ns,
            returned,
        });
        self.retry_deferred()
    }

    fn grant(&mut self, pid: Pid, slot: SlotId, resource: ResourceIndex) -> Result<()> {
        self.check_invariants()?;
        self.stats.grants += 1;
        self.emit_decision(pid, slot, resource, ResourceDecision::Granted);
        self.send_reply(slot, &Reply::Granted { resource })
    }

    /// Re-evaluate every deferred request in slot order
    fn retry_deferred(&mut self) -> Result<()> {
        let pending: Vec<(SlotId, ResourceIndex)> =
            self.deferred.iter().map(|(s, r)| (*s, *r)).collect();

        for (slot, resource) in pending {
            let Some(pid) = self.live.get(&slot).map(|w| w.pid) else {
                self.deferred.remove(&slot);
                continue;
            };
            let decision = self.table.write().request(slot, resource);
            match decision {
                Ok(Decision::Granted) => {
                    self.deferred.remove(&slot);
                    self.grant(pid, slot, resource)?;
                }
                Ok(Decision::Deferred(_)) => {}
                Err(e) => {
                    self.deferred.remove(&slot);
                    self.reject(pid, slot, resource, e.to_string())?;
                }
            }
        }
        Ok(())
    }

    fn reject(&mut self, pid: Pid, slot: SlotId, resource: ResourceIndex, reason: String) -> Result<()> {
        warn!(pid = %pid, slot = %slot, resource, reason = %reason, "Protocol violation");
        self.stats.rejections += 1;
        self.emit_decision(pid, slot, resource, ResourceDecision::Rejected(reason.clone()));
        self.send_reply(slot, &Reply::Rejected { reason })
    }

    /// Replies to a worker that is already gone are dropped; anything else is fatal
    fn send_reply(&self, slot: SlotId, reply: &Reply) -> Result<()> {
        match self.channel.reply(slot, reply) {
            Ok(()) => Ok(()),
            Err(IpcError::NoMailbox(_)) | Err(IpcError::Disconnected(_)) => {
                debug!(slot = %slot, "Reply dropped, worker gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn emit_decision(&self, pid: Pid, slot: SlotId, resource: ResourceIndex, decision: ResourceDecision) {
        self.events.emit(SimEvent::Decision {
            pid,
            slot,
            resource,
            decision,
            at: self.clock.read(),
        });
    }

    fn check_invariants(&self) -> Result<()> {
        if cfg!(debug_assertions) {
            self.table.read().check_invariants()?;
        }
        Ok(())
    }

    // ========================================================================
    // Reaping and shutdown
    // ========================================================================

    /// Poll task handles without blocking
    async fn reap_exited(&mut self) -> Result<()> {
        let mut index = 0;
        while index < self.exiting.len() {
            if self.exiting[index].handle.is_finished() {
                let worker = self.exiting.swap_remove(index);
                let exit = finished_exit(worker.handle).await;
                self.events.emit(SimEvent::Reaped {
                    pid: worker.pid,
                    slot: worker.slot,
                    exit,
                });
            } else {
                index += 1;
            }
        }

        // Live workers that ended without TERMINATE (panic or lost channel)
        let lost: Vec<SlotId> = self
            .live
            .iter()
            .filter(|(_, w)| w.handle.is_finished())
            .map(|(slot, _)| *slot)
            .collect();
        for slot in lost {
            if let Some(worker) = self.live.remove(&slot) {
                let exit = finished_exit(worker.handle).await;
                warn!(pid = %worker.pid, slot = %slot, exit = %exit, "Worker exited without terminating");
                self.forget(worker.pid, slot, exit)?;
                self.stats.aborted += 1;
            }
        }
        Ok(())
    }

    /// Drop every trace of a worker that will not send TERMINATE
    fn forget(&mut self, pid: Pid, slot: SlotId, exit: WorkerExit) -> Result<()> {
        self.deferred.remove(&slot);
        self.table.write().reclaim(slot)?;
        self.channel.unregister(slot);
        self.slots.release(slot);
        self.events.emit(SimEvent::Reaped { pid, slot, exit });
        if !self.shutdown.is_triggered() {
            self.retry_deferred()?;
        }
        Ok(())
    }

    /// Broadcast the forced-termination notice, wait a bounded time for
    /// every worker, then abort whatever is left
    async fn shutdown_workers(&mut self, reason: ShutdownReason) {
        self.events.emit(SimEvent::ShutdownStarted {
            reason,
            at: self.clock.read(),
            live: self.live.len(),
        });

        // Deferred requests are answered by the notice itself
        self.deferred.clear();
        match self.channel.broadcast(&Reply::Shutdown) {
            Ok(delivered) => debug!(delivered, "Shutdown notice broadcast"),
            Err(e) => warn!(error = %e, "Shutdown broadcast failed"),
        }

        let deadline = Instant::now() + self.config.reap_timeout;
        loop {
            let finished: Vec<SlotId> = self
                .live
                .iter()
                .filter(|(_, w)| w.handle.is_finished())
                .map(|(slot, _)| *slot)
                .collect();
            for slot in finished {
                if let Some(worker) = self.live.remove(&slot) {
                    let exit = finished_exit(worker.handle).await;
                    match exit {
                        WorkerExit::Forced => self.stats.forced_terminations += 1,
                        _ => self.stats.aborted += 1,
                    }
                    self.reap_on_shutdown(worker.pid, slot, exit);
                }
            }
            if let Err(e) = self.reap_exited().await {
                warn!(error = %e, "Reaping failed during shutdown");
            }

            if self.live.is_empty() && self.exiting.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                self.abort_stragglers();
                break;
            }
            tokio::time::sleep(REAP_POLL_INTERVAL).await;
        }
        info!(reason = %reason, "All workers reaped");
    }

    fn abort_stragglers(&mut self) {
        let stragglers = std::mem::take(&mut self.live);
        warn!(count = stragglers.len(), "Reaping bound expired, aborting workers");
        for (slot, worker) in stragglers {
            worker.handle.abort();
            self.stats.aborted += 1;
            self.reap_on_shutdown(worker.pid, slot, WorkerExit::Aborted);
        }
        for worker in std::mem::take(&mut self.exiting) {
            worker.handle.abort();
            self.events.emit(SimEvent::Reaped {
                pid: worker.pid,
                slot: worker.slot,
                exit: WorkerExit::Aborted,
            });
        }
    }

    /// Fold a shut-down worker's holdings back and free its slot
    fn reap_on_shutdown(&mut self, pid: Pid, slot: SlotId, exit: WorkerExit) {
        if let Err(e) = self.table.write().reclaim(slot) {
            warn!(slot = %slot, error = %e, "No table entry for reaped worker");
        }
        self.channel.unregister(slot);
        self.slots.release(slot);
        self.events.emit(SimEvent::Reaped { pid, slot, exit });
    }
}

/// Exit status of a task known to be finished; the await does not block
async fn finished_exit(handle: JoinHandle<WorkerExit>) -> WorkerExit {
    match handle.await {
        Ok(exit) => exit,
        Err(e) => {
            warn!(error = %e, "Worker task failed");
            WorkerExit::Aborted
        }
    }
}

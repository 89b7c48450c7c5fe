/*!
 * Worker
 *
 * Simulated user process. Each iteration it may issue one resource
 * operation and wait for the reply, then charges one work unit to the
 * shared clock and may decide to terminate.
 */

use super::action::choose_action;
use super::types::{Action, WorkerConfig, WorkerExit};
use crate::clock::SimClock;
use crate::core::types::ResourceVec;
use crate::ipc::{MessageKind, Reply, WorkerEndpoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{debug, trace, warn};

pub struct Worker {
    endpoint: WorkerEndpoint,
    clock: Arc<SimClock>,
    config: WorkerConfig,
    max_claim: ResourceVec,
    allocation: ResourceVec,
    work_done_ns: u64,
    rng: StdRng,
}

impl Worker {
    pub fn new(
        endpoint: WorkerEndpoint,
        clock: Arc<SimClock>,
        config: WorkerConfig,
        max_claim: ResourceVec,
        seed: u64,
    ) -> Self {
        let allocation = vec![0; max_claim.len()];
        Self {
            endpoint,
            clock,
            config,
            max_claim,
            allocation,
            work_done_ns: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Run until self-termination or forced shutdown
    pub async fn run(mut self) -> WorkerExit {
        let slot = self.endpoint.slot();
        debug!(pid = %self.endpoint.pid(), slot = %slot, "Worker started");

        loop {
            match self.endpoint.try_recv() {
                Ok(None) => {}
                Ok(Some(Reply::Shutdown)) => return self.exit(WorkerExit::Forced),
                Ok(Some(other)) => warn!(slot = %slot, reply = ?other, "Unsolicited reply ignored"),
                Err(_) => return self.exit(WorkerExit::Disconnected),
            }

            if self.rng.gen_bool(self.config.action_probability) {
                if let Some(action) = choose_action(&self.allocation, &self.max_claim, &mut self.rng) {
                    if let Some(exit) = self.perform(action).await {
                        return self.exit(exit);
                    }
                }
            }

            if self.clock.advance(self.config.work_unit_ns).await.is_err() {
                return self.exit(WorkerExit::Disconnected);
            }
            self.work_done_ns += self.config.work_unit_ns;

            if self.rng.gen_bool(self.config.termination_probability) {
                let exit = match self
                    .endpoint
                    .call(MessageKind::Terminate {
                        work_done_ns: self.work_done_ns,
                    })
                    .await
                {
                    Ok(Reply::Acknowledged { returned }) => {
                        debug_assert_eq!(returned, self.allocation);
                        WorkerExit::Completed
                    }
                    Ok(Reply::Shutdown) => WorkerExit::Forced,
                    Ok(other) => {
                        warn!(slot = %slot, reply = ?other, "Unexpected reply to terminate");
                        WorkerExit::Completed
                    }
                    Err(_) => WorkerExit::Disconnected,
                };
                return self.exit(exit);
            }

            tokio::task::yield_now().await;
        }
    }

    /// Send one operation and apply the reply; `Some` means stop
    async fn perform(&mut self, action: Action) -> Option<WorkerExit> {
        let slot = self.endpoint.slot();
        trace!(slot = %slot, action = ?action, "Issuing resource operation");

        match self.endpoint.call(action.message()).await {
            Ok(Reply::Granted { resource }) if action == Action::Request(resource) => {
                self.allocation[resource] += 1;
                None
            }
            Ok(Reply::Released { resource }) if action == Action::Release(resource) => {
                self.allocation[resource] -= 1;
                None
            }
            Ok(Reply::Shutdown) => Some(WorkerExit::Forced),
            Ok(Reply::Rejected { reason }) => {
                warn!(slot = %slot, action = ?action, reason = %reason, "Operation rejected");
                None
            }
            Ok(other) => {
                warn!(slot = %slot, action = ?action, reply = ?other, "Mismatched reply");
                None
            }
            Err(_) => Some(WorkerExit::Disconnected),
        }
    }

    fn exit(&self, exit: WorkerExit) -> WorkerExit {
        debug!(
            pid = %self.endpoint.pid(),
            slot = %self.endpoint.slot(),
            work_done_ns = self.work_done_ns,
            exit = %exit,
            "Worker exiting"
        );
        exit
    }
}

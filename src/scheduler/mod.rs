/*!
 * Scheduler Module
 * The controller, its spawn policy and the run summary
 */

mod controller;
mod spawn;
pub mod types;

pub use controller::Scheduler;
pub use spawn::SpawnTimer;
pub use types::{RunStats, RunSummary};

use crate::context::SharedContext;
use crate::core::config::SimConfig;
use crate::core::errors::Result;
use crate::monitoring::EventLog;
use crate::signals::ShutdownSignal;

/// Create the shared state, run the controller to completion and tear down
pub async fn simulate(config: SimConfig, events: EventLog, shutdown: ShutdownSignal) -> Result<RunSummary> {
    let mut rng = config.rng();
    let context = SharedContext::create(&config, &mut rng)?;
    let scheduler = Scheduler::new(config, context, shutdown, events, rng)?;
    Ok(scheduler.run().await)
}

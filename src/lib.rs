/*!
 * OSS Simulator Library
 *
 * A simulated operating-system scheduler: a controller task spawns a bounded
 * pool of worker tasks that share a logical clock, talk to the controller
 * over a message channel and negotiate resources under the Banker's
 * algorithm.
 */

pub mod clock;
pub mod context;
pub mod core;
pub mod ipc;
pub mod monitoring;
pub mod process;
pub mod resources;
pub mod scheduler;
pub mod signals;

// Re-exports
pub use clock::{SimClock, SimTime};
pub use context::{SharedContext, TeardownReport};
pub use crate::core::{ConfigError, Pid, Result, SimConfig, SimConfigBuilder, SimError, SlotId};
pub use ipc::{Envelope, MessageChannel, MessageKind, Reply};
pub use monitoring::{init_tracing, EventLog, EventSink, FileSink, MemorySink, SimEvent};
pub use process::{Worker, WorkerExit};
pub use resources::{Decision, DeferReason, ResourceTable};
pub use scheduler::{simulate, RunSummary, Scheduler};
pub use signals::{install_handlers, ShutdownReason, ShutdownSignal};

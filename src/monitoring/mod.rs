/*!
 * Monitoring
 * Structured tracing and the simulation event log
 */

mod events;
mod tracer;

pub use events::{EventLog, EventSink, FileSink, MemorySink, ResourceDecision, SimEvent};
pub use tracer::{generate_run_id, init_tracing, RunSpan};

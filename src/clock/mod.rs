/*!
 * Clock Module
 * Shared logical time for the controller and workers
 */

mod shared;
pub mod types;

pub use shared::{ClockGuard, SimClock};
pub use types::{ClockError, ClockResult, SimTime};

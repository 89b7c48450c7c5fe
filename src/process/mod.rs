/*!
 * Process Module
 * Simulated user processes
 */

mod action;
pub mod types;
mod worker;

pub use action::choose_action;
pub use types::{Action, WorkerConfig, WorkerExit};
pub use worker::Worker;

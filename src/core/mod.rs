/*!
 * Core Module
 * Fundamental simulator types, limits, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod id;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use config::{ConfigError, SimConfig, SimConfigBuilder};
pub use errors::{Result, SimError};
pub use id::{Pid, PidGenerator, SlotId, SlotPool};
pub use types::*;

/*!
 * Shutdown Types
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the run is ending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ShutdownReason {
    /// Simulated clock reached the configured end time
    SimEndReached = 1,
    /// Ctrl-C (SIGINT)
    Interrupted = 2,
    /// SIGTERM from outside
    Terminated = 3,
    /// Wall-clock limit (`-t`) expired
    WallTimeout = 4,
    /// The message channel failed mid-run
    IpcFailure = 5,
    /// Bookkeeping failure inside the controller
    Fault = 6,
}

impl ShutdownReason {
    /// Orderly reasons exit with status 0
    pub fn is_orderly(self) -> bool {
        !matches!(self, ShutdownReason::IpcFailure | ShutdownReason::Fault)
    }

    pub(crate) fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(ShutdownReason::SimEndReached),
            2 => Some(ShutdownReason::Interrupted),
            3 => Some(ShutdownReason::Terminated),
            4 => Some(ShutdownReason::WallTimeout),
            5 => Some(ShutdownReason::IpcFailure),
            6 => Some(ShutdownReason::Fault),
            _ => None,
        }
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ShutdownReason::SimEndReached => "simulated end time reached",
            ShutdownReason::Interrupted => "interrupted",
            ShutdownReason::Terminated => "terminated",
            ShutdownReason::WallTimeout => "wall-clock limit expired",
            ShutdownReason::IpcFailure => "message channel failure",
            ShutdownReason::Fault => "internal fault",
        };
        f.write_str(text)
    }
}

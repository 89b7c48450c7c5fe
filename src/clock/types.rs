/*!
 * Clock Types
 * Simulated time value and clock errors
 */

use crate::core::limits::NANOS_PER_SECOND;
use crate::core::types::Nanos;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Clock operation result
pub type ClockResult<T> = Result<T, ClockError>;

/// Clock errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
pub enum ClockError {
    #[error("simulated clock has been released")]
    #[diagnostic(
        code(clock::closed),
        help("The run is shutting down; stop touching shared time.")
    )]
    Closed,

    #[error("simulated clock was already released")]
    #[diagnostic(code(clock::already_released))]
    AlreadyReleased,
}

/// Logical time as (seconds, nanoseconds)
///
/// `nanos` is always below one billion; field order makes the derived
/// ordering chronological.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SimTime {
    pub secs: u64,
    pub nanos: u32,
}

impl SimTime {
    pub const ZERO: SimTime = SimTime { secs: 0, nanos: 0 };

    /// Build from parts, carrying excess nanoseconds into seconds
    pub fn new(secs: u64, nanos: u64) -> Self {
        Self {
            secs: secs.saturating_add(nanos / NANOS_PER_SECOND),
            nanos: (nanos % NANOS_PER_SECOND) as u32,
        }
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self { secs, nanos: 0 }
    }

    /// Total nanoseconds since the start of the run
    pub fn as_nanos(&self) -> u128 {
        self.secs as u128 * NANOS_PER_SECOND as u128 + self.nanos as u128
    }

    /// `self + delta`, carrying overflow into seconds
    pub fn add_nanos(self, delta: Nanos) -> Self {
        let nanos = self.nanos as u64 + delta % NANOS_PER_SECOND;
        Self {
            secs: self
                .secs
                .saturating_add(delta / NANOS_PER_SECOND)
                .saturating_add(nanos / NANOS_PER_SECOND),
            nanos: (nanos % NANOS_PER_SECOND) as u32,
        }
    }

    /// Nanoseconds from `earlier` to `self`, zero if `earlier` is later
    pub fn nanos_since(&self, earlier: SimTime) -> u128 {
        self.as_nanos().saturating_sub(earlier.as_nanos())
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}

/*!
 * Resource Types
 * Process entries, allocation decisions and resource-table errors
 */

use crate::core::id::SlotId;
use crate::core::types::{ResourceIndex, ResourceVec};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Resource table operation result
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Resource table errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
pub enum ResourceError {
    #[error("slot {0} has no admitted process")]
    #[diagnostic(code(resources::unknown_slot))]
    UnknownSlot(SlotId),

    #[error("slot {slot} is outside the table (capacity {capacity})")]
    #[diagnostic(code(resources::slot_out_of_range))]
    SlotOutOfRange { slot: SlotId, capacity: usize },

    #[error("slot {0} is already occupied")]
    #[diagnostic(code(resources::slot_occupied))]
    SlotOccupied(SlotId),

    #[error("resource {resource} does not exist ({count} kinds)")]
    #[diagnostic(code(resources::invalid_resource))]
    InvalidResource {
        resource: ResourceIndex,
        count: usize,
    },

    #[error("claim vector has {got} entries, expected {expected}")]
    #[diagnostic(code(resources::claim_length))]
    ClaimLengthMismatch { expected: usize, got: usize },

    #[error("slot {slot} already holds its max claim of {claim} for resource {resource}")]
    #[diagnostic(
        code(resources::claim_exceeded),
        help("A process may never hold more than it declared at admission.")
    )]
    ClaimExceeded {
        slot: SlotId,
        resource: ResourceIndex,
        claim: u32,
    },

    #[error("slot {slot} holds no instance of resource {resource}")]
    #[diagnostic(code(resources::not_held))]
    NotHeld {
        slot: SlotId,
        resource: ResourceIndex,
    },

    #[error("a table needs at least one resource kind and one slot ({kinds} kinds, {capacity} slots)")]
    #[diagnostic(code(resources::empty_table))]
    EmptyTable { kinds: usize, capacity: usize },

    #[error("resource table was already released")]
    #[diagnostic(code(resources::already_released))]
    AlreadyReleased,

    #[error("resource table invariant violated: {0}")]
    #[diagnostic(
        code(resources::invariant),
        help("This indicates a bookkeeping bug. Please report it.")
    )]
    InvariantViolated(String),
}

/// Why a request could not be granted right away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferReason {
    /// No free instance of the resource
    Unavailable,
    /// Granting would leave the system without a safe completion order
    Unsafe,
}

/// Outcome of evaluating a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Granted,
    Deferred(DeferReason),
}

impl fmt::Display for DeferReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeferReason::Unavailable => write!(f, "unavailable"),
            DeferReason::Unsafe => write!(f, "unsafe"),
        }
    }
}

/// One admitted process in the resource table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub slot: SlotId,
    pub max_claim: ResourceVec,
    pub allocation: ResourceVec,
}

impl ProcessEntry {
    pub fn new(slot: SlotId, max_claim: ResourceVec) -> Self {
        let allocation = vec![0; max_claim.len()];
        Self {
            slot,
            max_claim,
            allocation,
        }
    }

    /// Remaining claim: `max_claim - allocation`
    pub fn need(&self) -> ResourceVec {
        self.max_claim
            .iter()
            .zip(&self.allocation)
            .map(|(max, held)| max - held)
            .collect()
    }

    pub fn holds_nothing(&self) -> bool {
        self.allocation.iter().all(|&held| held == 0)
    }
}

/// Point-in-time copy of the table for observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub total: ResourceVec,
    pub available: ResourceVec,
    pub entries: Vec<ProcessEntry>,
}

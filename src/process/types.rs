/*!
 * Worker Types
 * Actions, exit status and per-worker tuning
 */

use crate::core::config::SimConfig;
use crate::core::types::ResourceIndex;
use crate::ipc::MessageKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One resource operation a worker decided to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Request(ResourceIndex),
    Release(ResourceIndex),
}

impl Action {
    pub fn message(self) -> MessageKind {
        match self {
            Action::Request(resource) => MessageKind::Request { resource },
            Action::Release(resource) => MessageKind::Release { resource },
        }
    }
}

/// How a worker task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerExit {
    /// Terminated on its own and was acknowledged
    Completed,
    /// Received the forced-termination notice
    Forced,
    /// Clock or channel went away underneath it
    Disconnected,
    /// Aborted after the reaping bound expired
    Aborted,
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerExit::Completed => write!(f, "completed"),
            WorkerExit::Forced => write!(f, "forced"),
            WorkerExit::Disconnected => write!(f, "disconnected"),
            WorkerExit::Aborted => write!(f, "aborted"),
        }
    }
}

/// Per-worker behaviour knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkerConfig {
    pub work_unit_ns: u64,
    pub action_probability: f64,
    pub termination_probability: f64,
}

impl From<&SimConfig> for WorkerConfig {
    fn from(config: &SimConfig) -> Self {
        Self {
            work_unit_ns: config.work_unit_ns,
            action_probability: config.action_probability,
            termination_probability: config.termination_probability,
        }
    }
}

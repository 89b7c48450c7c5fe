/*!
 * IPC Types
 * Message envelopes, replies and IPC errors
 */

use crate::core::id::{Pid, SlotId};
use crate::core::types::{ResourceIndex, ResourceVec};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// IPC operation result
pub type IpcResult<T> = Result<T, IpcError>;

/// Unified IPC error type
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
pub enum IpcError {
    #[error("channel closed: {0}")]
    #[diagnostic(code(ipc::closed))]
    Closed(String),

    #[error("peer disconnected: {0}")]
    #[diagnostic(code(ipc::disconnected))]
    Disconnected(String),

    #[error("no mailbox registered for slot {0}")]
    #[diagnostic(code(ipc::no_mailbox))]
    NoMailbox(SlotId),

    #[error("slot {0} already has a mailbox")]
    #[diagnostic(code(ipc::mailbox_exists))]
    MailboxExists(SlotId),

    #[error("unsupported wire version {got} (expected {expected})")]
    #[diagnostic(
        code(ipc::version_mismatch),
        help("Both ends of the channel must speak the same protocol version.")
    )]
    VersionMismatch { expected: u8, got: u8 },

    #[error("malformed frame: {0}")]
    #[diagnostic(code(ipc::malformed))]
    Malformed(String),

    #[error("failed to encode message: {0}")]
    #[diagnostic(code(ipc::encode))]
    Encode(String),

    #[error("controller inbox already taken")]
    #[diagnostic(code(ipc::inbox_taken))]
    InboxTaken,

    #[error("message channel was already released")]
    #[diagnostic(code(ipc::already_released))]
    AlreadyReleased,
}

/// What a worker asks of the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Ask for one instance of a resource
    Request { resource: ResourceIndex },
    /// Give back one instance of a resource
    Release { resource: ResourceIndex },
    /// Leaving; carries the total simulated work the worker performed
    Terminate { work_done_ns: u64 },
}

/// Worker-to-controller message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub sender_pid: Pid,
    pub sender_slot: SlotId,
    pub kind: MessageKind,
}

impl Envelope {
    pub fn new(sender_pid: Pid, sender_slot: SlotId, kind: MessageKind) -> Self {
        Self {
            sender_pid,
            sender_slot,
            kind,
        }
    }
}

/// Controller-to-worker message, routed by slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reply {
    /// One instance of `resource` now belongs to the worker
    Granted { resource: ResourceIndex },
    /// The release was recorded
    Released { resource: ResourceIndex },
    /// Termination acknowledged; `returned` is what went back to the pool
    Acknowledged { returned: ResourceVec },
    /// The message broke the protocol and was ignored
    Rejected { reason: String },
    /// Forced termination notice
    Shutdown,
}

/// Channel counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub messages_sent: u64,
    pub replies_sent: u64,
    pub live_mailboxes: usize,
}

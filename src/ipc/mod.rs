/*!
 * IPC Module
 * Message passing between workers and the controller
 */

mod channel;
pub mod types;
pub mod wire;

// Re-export for convenience
pub use channel::{ControllerInbox, MessageChannel, WorkerEndpoint};
pub use types::{ChannelStats, Envelope, IpcError, IpcResult, MessageKind, Reply};

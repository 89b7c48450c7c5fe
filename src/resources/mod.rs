/*!
 * Resources Module
 * Resource-allocation table with Banker's-algorithm deadlock avoidance
 */

pub mod banker;
mod slots;
mod table;
pub mod types;

pub use slots::SlotTable;
pub use table::ResourceTable;
pub use types::{
    Decision, DeferReason, ProcessEntry, ResourceError, ResourceResult, TableSnapshot,
};

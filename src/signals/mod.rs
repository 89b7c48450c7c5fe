/*!
 * Signals Module
 * Shutdown flag and the external sources that raise it
 */

mod handlers;
mod shutdown;
pub mod types;

pub use handlers::install_handlers;
pub use shutdown::ShutdownSignal;
pub use types::ShutdownReason;

/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use miette::Diagnostic;
use thiserror::Error;

pub use super::config::ConfigError;
pub use crate::clock::ClockError;
pub use crate::ipc::IpcError;
pub use crate::resources::ResourceError;

/// Unified simulator error type with miette diagnostics
#[derive(Error, Debug, Diagnostic)]
pub enum SimError {
    #[error("Configuration error: {0}")]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to initialize {resource}: {reason}")]
    #[diagnostic(
        code(sim::resource_init),
        help("Shared state could not be created. Anything already created was released.")
    )]
    ResourceInit {
        resource: &'static str,
        reason: String,
    },

    #[error("IPC error: {0}")]
    #[diagnostic(transparent)]
    Ipc(#[from] IpcError),

    #[error("Clock error: {0}")]
    #[diagnostic(transparent)]
    Clock(#[from] ClockError),

    #[error("Resource table error: {0}")]
    #[diagnostic(transparent)]
    Resource(#[from] ResourceError),
}

impl SimError {
    pub fn resource_init(resource: &'static str, reason: impl Into<String>) -> Self {
        SimError::ResourceInit {
            resource,
            reason: reason.into(),
        }
    }
}

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error: SimError = ConfigError::MissingLogFile.into();
        assert_eq!(
            error.to_string(),
            "Configuration error: a log file path is required"
        );
    }

    #[test]
    fn test_resource_init_display() {
        let error = SimError::resource_init("event log", "permission denied");
        assert_eq!(
            error.to_string(),
            "Failed to initialize event log: permission denied"
        );
    }

    #[test]
    fn test_from_ipc_error() {
        let error: SimError = IpcError::Closed("controller".into()).into();
        assert!(matches!(error, SimError::Ipc(_)));
    }
}

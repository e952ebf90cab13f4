//! Unified error surface for daemon launch and supervision.

use hostbridge_protocol::ErrorCode;
use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::service::ServiceError;

use super::signals::SignalError;

/// Errors surfaced while launching or supervising the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The command service failed to start or stop.
    #[error("command service failed: {0}")]
    Service(#[from] ServiceError),
    /// Signal handling failed.
    #[error(transparent)]
    Signals(#[from] SignalError),
}

impl LaunchError {
    /// Returns the protocol code that classifies the failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Bootstrap(BootstrapError::Configuration { .. } | BootstrapError::Commands { .. }) => {
                ErrorCode::ConfigurationError
            }
            Self::Bootstrap(BootstrapError::Telemetry { .. })
            | Self::Service(_)
            | Self::Signals(_) => ErrorCode::ServiceStartupFailed,
        }
    }
}

//! Error surface for launching and supervising the master process.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::refresh::RefreshError;

use super::shutdown::ShutdownError;

/// Errors surfaced while running the master process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// Waiting for a shutdown signal failed.
    #[error("failed to await shutdown: {source}")]
    Shutdown {
        /// Underlying signal error.
        #[source]
        source: ShutdownError,
    },
    /// The pod-cache refresh task did not stop cleanly.
    #[error("failed to stop background refresh: {source}")]
    Refresh {
        /// Underlying refresh error.
        #[source]
        source: RefreshError,
    },
}

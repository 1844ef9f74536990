//! Foreground run loop for the master binary.

use std::sync::Arc;

use tracing::{error, info};

use crate::apiserver::ApiVersion;
use crate::bootstrap::{Collaborators, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::status::{StatusReporter, StructuredStatusReporter};
use crate::storage::InMemoryStorage;

use super::shutdown::{ShutdownSignal, SystemShutdownSignal};
use super::{LaunchError, PROCESS_TARGET};

/// Runs the master with process-local storage until a termination signal.
pub fn run_master() -> Result<(), LaunchError> {
    let reporter = Arc::new(StructuredStatusReporter::new());
    let collaborators = Collaborators::new(Arc::new(InMemoryStorage::new()));
    run_master_with(
        &SystemConfigLoader,
        reporter,
        collaborators,
        &SystemShutdownSignal,
    )
}

/// Runs the master with injected collaborators.
///
/// The refresh task is stopped and joined once `shutdown` returns, whether
/// or not waiting succeeded. Every failure is logged before it is returned,
/// so callers only need to pick an exit code.
pub fn run_master_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn StatusReporter>,
    collaborators: Collaborators,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    let bootstrapped = bootstrap_with(loader, reporter, collaborators)?;
    for version in ApiVersion::ALL {
        let group = bootstrapped.master().api(version);
        info!(
            target: PROCESS_TARGET,
            version = %version,
            root = %group.root,
            kinds = group.storage.len(),
            "api exported"
        );
    }

    let (_master, refresher) = bootstrapped.into_parts();
    let waited = shutdown.wait();
    refresher.shutdown();
    let outcome = refresher
        .join()
        .map_err(|source| LaunchError::Refresh { source })
        .and(waited.map_err(|source| LaunchError::Shutdown { source }));
    match &outcome {
        Ok(()) => info!(target: PROCESS_TARGET, "master stopped"),
        Err(error) => error!(target: PROCESS_TARGET, error = %error, "master stopped uncleanly"),
    }
    outcome
}

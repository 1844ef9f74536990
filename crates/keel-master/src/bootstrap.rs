//! Master bootstrap orchestration.

use std::sync::Arc;

use keel_config::Settings;
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use crate::clock::Clock;
use crate::cloud::CloudProvider;
use crate::master::{Master, MasterConfig, MasterError};
use crate::node::HealthChecker;
use crate::pod_cache::PodInfoGetter;
use crate::refresh::RefreshHandle;
use crate::status::StatusReporter;
use crate::storage::StorageBackend;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the master settings.
    fn load(&self) -> Result<Settings, Arc<OrthoError>>;
}

/// Loader that reads defaults, file, environment and command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Settings, Arc<OrthoError>> {
        Settings::load()
    }
}

/// Loader returning fixed settings.
#[derive(Debug, Default, Clone)]
pub struct StaticConfigLoader {
    settings: Settings,
}

impl StaticConfigLoader {
    /// Builds a loader that always yields `settings`.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Settings, Arc<OrthoError>> {
        Ok(self.settings.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The master could not be assembled.
    #[error("failed to assemble master: {source}")]
    Master {
        /// Underlying assembly error.
        #[source]
        source: MasterError,
    },
}

/// Runtime collaborators that configuration files cannot describe.
///
/// Anything left unset falls back to the [`MasterConfig::new`] defaults.
#[derive(Clone)]
pub struct Collaborators {
    storage: Arc<dyn StorageBackend>,
    cloud: Option<Arc<dyn CloudProvider>>,
    health_checker: Option<Arc<dyn HealthChecker>>,
    pod_info: Option<Arc<dyn PodInfoGetter>>,
    clock: Option<Arc<dyn Clock>>,
}

impl Collaborators {
    /// Starts from the required storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            cloud: None,
            health_checker: None,
            pod_info: None,
            clock: None,
        }
    }

    /// Sets the cloud provider.
    #[must_use]
    pub fn with_cloud(mut self, cloud: Arc<dyn CloudProvider>) -> Self {
        self.cloud = Some(cloud);
        self
    }

    /// Sets the node health checker.
    #[must_use]
    pub fn with_health_checker(mut self, checker: Arc<dyn HealthChecker>) -> Self {
        self.health_checker = Some(checker);
        self
    }

    /// Sets the pod-info source.
    #[must_use]
    pub fn with_pod_info(mut self, pod_info: Arc<dyn PodInfoGetter>) -> Self {
        self.pod_info = Some(pod_info);
        self
    }

    /// Sets the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Combines the collaborators with loaded settings.
    #[must_use]
    pub fn into_config(self, settings: Settings) -> MasterConfig {
        let mut config = MasterConfig::new(settings, self.storage);
        config.cloud = self.cloud;
        if let Some(checker) = self.health_checker {
            config = config.with_health_checker(checker);
        }
        if let Some(pod_info) = self.pod_info {
            config = config.with_pod_info(pod_info);
        }
        if let Some(clock) = self.clock {
            config = config.with_clock(clock);
        }
        config
    }
}

/// Result of a successful bootstrap invocation.
pub struct Bootstrapped {
    settings: Settings,
    master: Master,
    refresher: RefreshHandle,
    telemetry: TelemetryHandle,
}

impl Bootstrapped {
    /// Accessor for the resolved settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Accessor for the assembled master.
    #[must_use]
    pub fn master(&self) -> &Master {
        &self.master
    }

    /// Accessor for the pod-cache refresh task.
    #[must_use]
    pub fn refresher(&self) -> &RefreshHandle {
        &self.refresher
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Splits off the master and its refresh task.
    #[must_use]
    pub fn into_parts(self) -> (Master, RefreshHandle) {
        (self.master, self.refresher)
    }
}

/// Bootstraps the master using the supplied collaborators.
///
/// Every failure is reported through `reporter` before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn StatusReporter>,
    collaborators: Collaborators,
) -> Result<Bootstrapped, BootstrapError> {
    reporter.bootstrap_starting();

    let settings = match loader.load() {
        Ok(settings) => settings,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&settings) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let config = collaborators.into_config(settings.clone());
    let (master, refresher) = match Master::new(config, reporter.as_ref()) {
        Ok(parts) => parts,
        Err(source) => {
            let error = BootstrapError::Master { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };
    reporter.bootstrap_succeeded(&settings);

    Ok(Bootstrapped {
        settings,
        master,
        refresher,
        telemetry,
    })
}

//! Test harness utilities for the master behavioural suite.

use std::ffi::OsString;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use keel_config::Settings;
use ortho_config::{OrthoConfig, OrthoError};

use crate::bootstrap::{
    BootstrapError, Bootstrapped, Collaborators, ConfigLoader, StaticConfigLoader, bootstrap_with,
};
use crate::cloud::{CloudError, CloudProvider, Instances, TcpLoadBalancer};
use crate::master::{Master, MasterConfig, MasterError};
use crate::node::{HealthChecker, HealthStatus, RegistryLayer};
use crate::refresh::RefreshHandle;
use crate::registry::RegistryError;
use crate::status::StatusReporter;
use crate::storage::{InMemoryStorage, StorageBackend, StorageError};

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    pub settings: Settings,
    pub cloud: Option<Arc<dyn CloudProvider>>,
    pub reporter: Arc<RecordingStatusReporter>,
    pub storage: Arc<dyn StorageBackend>,
    failing_loader: bool,
    master: Option<Master>,
    refresher: Option<RefreshHandle>,
    master_error: Option<MasterError>,
    bootstrap_error: Option<BootstrapError>,
}

impl TestWorld {
    /// Builds a world with default settings and no cloud.
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            cloud: None,
            reporter: Arc::new(RecordingStatusReporter::default()),
            storage: Arc::new(InMemoryStorage::new()),
            failing_loader: false,
            master: None,
            refresher: None,
            master_error: None,
            bootstrap_error: None,
        }
    }

    /// Installs a loader that rejects its command line.
    pub fn use_failing_loader(&mut self) {
        self.failing_loader = true;
    }

    /// Assembles the master directly from the world's settings.
    pub fn assemble(&mut self) {
        if self.master.is_some() || self.master_error.is_some() {
            return;
        }
        let mut config = MasterConfig::new(self.settings.clone(), Arc::clone(&self.storage))
            .with_health_checker(Arc::new(FixedHealth(HealthStatus::Healthy)));
        config.cloud = self.cloud.clone();
        match Master::new(config, self.reporter.as_ref()) {
            Ok((master, refresher)) => {
                self.master = Some(master);
                self.refresher = Some(refresher);
            }
            Err(error) => self.master_error = Some(error),
        }
    }

    /// Runs the full bootstrap with the world's loader.
    pub fn bootstrap(&mut self) {
        if self.master.is_some() || self.bootstrap_error.is_some() {
            return;
        }
        let configured = StaticConfigLoader::new(self.settings.clone());
        let loader: &dyn ConfigLoader = if self.failing_loader {
            &FailingConfigLoader
        } else {
            &configured
        };
        let collaborators = Collaborators::new(Arc::clone(&self.storage))
            .with_health_checker(Arc::new(FixedHealth(HealthStatus::Healthy)));
        match bootstrap_with(loader, self.reporter.clone(), collaborators) {
            Ok(bootstrapped) => self.keep(bootstrapped),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    fn keep(&mut self, bootstrapped: Bootstrapped) {
        let (master, refresher) = bootstrapped.into_parts();
        self.master = Some(master);
        self.refresher = Some(refresher);
    }

    /// The assembled master, if any.
    pub fn master(&self) -> Option<&Master> {
        self.master.as_ref()
    }

    /// The running refresh task, if any.
    pub fn refresher(&self) -> Option<&RefreshHandle> {
        self.refresher.as_ref()
    }

    /// Error from direct assembly, if any.
    pub fn master_error(&self) -> Option<&MasterError> {
        self.master_error.as_ref()
    }

    /// Error from bootstrap, if any.
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.shutdown();
        }
    }
}

/// Loader that intentionally fails by passing an invalid CLI value.
struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Settings, Arc<OrthoError>> {
        let args = vec![
            OsString::from("keel-master"),
            OsString::from("--node-cache-ttl-secs"),
            OsString::from("soon"),
        ];
        Settings::load_from_iter(args)
    }
}

/// Storage backend that serves empty reads and rejects every write.
pub struct RejectingStorage;

impl RejectingStorage {
    fn offline() -> StorageError {
        StorageError::unavailable("storage is read-only")
    }
}

impl StorageBackend for RejectingStorage {
    fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(None)
    }

    fn create(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: Option<Duration>,
    ) -> Result<(), StorageError> {
        Err(Self::offline())
    }

    fn set(&self, _key: &str, _value: Vec<u8>) -> Result<(), StorageError> {
        Err(Self::offline())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        Err(StorageError::NotFound {
            key: key.to_owned(),
        })
    }

    fn list(&self, _prefix: &str) -> Result<Vec<Vec<u8>>, StorageError> {
        Ok(Vec::new())
    }
}

/// Health checker returning the same verdict for every node.
pub struct FixedHealth(pub HealthStatus);

impl HealthChecker for FixedHealth {
    fn check(&self, _host: &str) -> HealthStatus {
        self.0
    }
}

/// Cloud provider whose capabilities are chosen per scenario.
#[derive(Default)]
pub struct FakeCloud {
    pub instances: Option<Arc<FakeInstances>>,
}

impl CloudProvider for FakeCloud {
    fn name(&self) -> &str {
        "fake"
    }

    fn instances(&self) -> Option<Arc<dyn Instances>> {
        self.instances
            .clone()
            .map(|instances| instances as Arc<dyn Instances>)
    }

    fn tcp_load_balancer(&self) -> Option<Arc<dyn TcpLoadBalancer>> {
        None
    }
}

/// Instance listing over a fixed set of names.
#[derive(Default)]
pub struct FakeInstances {
    pub names: Vec<String>,
    pub fail_listing: bool,
}

impl Instances for FakeInstances {
    fn list(&self, pattern: &str) -> Result<Vec<String>, CloudError> {
        if self.fail_listing {
            return Err(CloudError::new("instance listing unavailable"));
        }
        Ok(self
            .names
            .iter()
            .filter(|name| name.starts_with(pattern.trim_end_matches('*')))
            .cloned()
            .collect())
    }

    fn ip_address(&self, name: &str) -> Result<String, CloudError> {
        Err(CloudError::new(format!("no address known for '{name}'")))
    }
}

/// Records status events for assertions.
#[derive(Default)]
pub struct RecordingStatusReporter {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingStatusReporter {
    /// Captures a copy of the recorded events.
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events
            .lock()
            .expect("status reporter mutex poisoned")
            .clone()
    }

    /// The most recently reported node-registry chain.
    pub fn last_chain(&self) -> Option<Vec<RegistryLayer>> {
        self.events().into_iter().rev().find_map(|event| match event {
            StatusEvent::NodeRegistryReady(layers) => Some(layers),
            _ => None,
        })
    }

    fn record(&self, event: StatusEvent) {
        self.events
            .lock()
            .expect("status reporter mutex poisoned")
            .push(event);
    }
}

impl StatusReporter for RecordingStatusReporter {
    fn bootstrap_starting(&self) {
        self.record(StatusEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _settings: &Settings) {
        self.record(StatusEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(StatusEvent::BootstrapFailed(error.to_string()));
    }

    fn node_discovery_failed(&self, error: &RegistryError) {
        self.record(StatusEvent::NodeDiscoveryFailed(error.to_string()));
    }

    fn node_cache_failed(&self, error: &RegistryError) {
        self.record(StatusEvent::NodeCacheFailed(error.to_string()));
    }

    fn node_registry_ready(&self, layers: &[RegistryLayer]) {
        self.record(StatusEvent::NodeRegistryReady(layers.to_vec()));
    }

    fn refresh_started(&self, task: &str, _interval: Duration) {
        self.record(StatusEvent::RefreshStarted(task.to_owned()));
    }
}

/// Structured status events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed successfully.
    BootstrapSucceeded,
    /// Bootstrap failed with an error description.
    BootstrapFailed(String),
    /// Cloud discovery failed with an error description.
    NodeDiscoveryFailed(String),
    /// Node caching failed with an error description.
    NodeCacheFailed(String),
    /// The node-registry chain was finalised.
    NodeRegistryReady(Vec<RegistryLayer>),
    /// A refresh task started.
    RefreshStarted(String),
}

/// Default test world fixture.
pub fn world() -> std::cell::RefCell<TestWorld> {
    std::cell::RefCell::new(TestWorld::new())
}

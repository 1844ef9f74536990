//! Master assembly: registries, pod cache refresh, storage map and exporters.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use keel_config::Settings;
use thiserror::Error;

use crate::api::ResourceKind;
use crate::apiserver::{ApiGroup, ApiVersion, JsonCodec, JsonSelfLinker, SelfLinker, StorageMap};
use crate::clock::{Clock, SystemClock};
use crate::cloud::CloudProvider;
use crate::node::{HealthChecker, NodeRegistry, TcpHealthChecker, build_node_registry};
use crate::pod_cache::{PodCache, PodInfoGetter, UnavailablePodInfo};
use crate::refresh::{RefreshError, RefreshHandle, spawn_periodic};
use crate::registry::{
    BasicManifestFactory, BindingRegistry, ControllerRegistry, EndpointRegistry, EventRegistry,
    ManifestFactory, PodRegistry, RegistryError, ServiceRegistry,
};
use crate::rest::{
    BindingStorage, ControllerStorage, EndpointStorage, EventStorage, NodeStorage, PodStorage,
    RestStorage, ServiceStorage,
};
use crate::status::StatusReporter;
use crate::storage::StorageBackend;

/// Delay between pod-cache refresh passes.
pub const POD_CACHE_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Connect timeout used by the default node health checker.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

const POD_CACHE_TASK: &str = "pod-cache-refresh";

/// Errors that abort master construction.
#[derive(Debug, Error)]
pub enum MasterError {
    /// A configured node could not be registered.
    #[error("failed to register static node '{id}': {source}")]
    StaticNode {
        /// Node that could not be created.
        id: String,
        /// Underlying registry error.
        #[source]
        source: RegistryError,
    },
    /// The pod-cache refresh task could not be started.
    #[error("failed to start pod cache refresh: {source}")]
    Refresh {
        /// Underlying refresh error.
        #[source]
        source: RefreshError,
    },
}

/// Inputs read once while the master is assembled.
#[derive(Clone)]
pub struct MasterConfig {
    /// Operational policy.
    pub settings: Settings,
    /// Backing store for every undecorated registry.
    pub storage: Arc<dyn StorageBackend>,
    /// Cloud integration, when running on a cloud.
    pub cloud: Option<Arc<dyn CloudProvider>>,
    /// Probe used when node health checking is enabled.
    pub health_checker: Arc<dyn HealthChecker>,
    /// Source of per-pod container state.
    pub pod_info: Arc<dyn PodInfoGetter>,
    /// Time source for TTL decisions.
    pub clock: Arc<dyn Clock>,
}

impl MasterConfig {
    /// Builds a configuration with no cloud, a TCP health checker on the
    /// configured port, no pod-info source and the system clock.
    #[must_use]
    pub fn new(settings: Settings, storage: Arc<dyn StorageBackend>) -> Self {
        let health_checker = Arc::new(TcpHealthChecker::new(
            settings.health_check_port,
            HEALTH_CHECK_TIMEOUT,
        ));
        Self {
            settings,
            storage,
            cloud: None,
            health_checker,
            pod_info: Arc::new(UnavailablePodInfo),
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets the cloud provider.
    #[must_use]
    pub fn with_cloud(mut self, cloud: Arc<dyn CloudProvider>) -> Self {
        self.cloud = Some(cloud);
        self
    }

    /// Replaces the node health checker.
    #[must_use]
    pub fn with_health_checker(mut self, checker: Arc<dyn HealthChecker>) -> Self {
        self.health_checker = checker;
        self
    }

    /// Replaces the pod-info source.
    #[must_use]
    pub fn with_pod_info(mut self, pod_info: Arc<dyn PodInfoGetter>) -> Self {
        self.pod_info = pod_info;
        self
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// One registry per resource kind.
///
/// Only `nodes` may be decorated; the others are plain views over `storage`.
#[derive(Clone)]
pub struct RegistrySet {
    /// Pods.
    pub pods: Arc<PodRegistry>,
    /// Replication controllers.
    pub controllers: Arc<ControllerRegistry>,
    /// Services.
    pub services: Arc<ServiceRegistry>,
    /// Service endpoints.
    pub endpoints: Arc<EndpointRegistry>,
    /// Nodes, possibly wrapped by health filtering and caching.
    pub nodes: Arc<dyn NodeRegistry>,
    /// Events, expiring after the configured TTL.
    pub events: Arc<EventRegistry>,
    /// Pod bindings.
    pub bindings: Arc<BindingRegistry>,
    /// Renders manifests for bound pods from the service registry.
    pub manifests: Arc<dyn ManifestFactory>,
    /// Shared backing store.
    pub storage: Arc<dyn StorageBackend>,
}

impl RegistrySet {
    /// Builds the undecorated registries over `storage` around `nodes`.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        nodes: Arc<dyn NodeRegistry>,
        event_ttl: Duration,
    ) -> Self {
        let services = Arc::new(ServiceRegistry::new(Arc::clone(&storage)));
        Self {
            pods: Arc::new(PodRegistry::new(Arc::clone(&storage))),
            controllers: Arc::new(ControllerRegistry::new(Arc::clone(&storage))),
            manifests: Arc::new(BasicManifestFactory::new(Arc::clone(&services))),
            services,
            endpoints: Arc::new(EndpointRegistry::new(Arc::clone(&storage))),
            nodes,
            events: Arc::new(EventRegistry::with_ttl(Arc::clone(&storage), event_ttl)),
            bindings: Arc::new(BindingRegistry::new(Arc::clone(&storage))),
            storage,
        }
    }
}

/// Maps every resource kind to its REST storage adapter.
///
/// Only wires existing handles together; nothing is read or written.
#[must_use]
pub fn assemble_storage(
    registries: &RegistrySet,
    pod_cache: &Arc<PodCache>,
    config: &MasterConfig,
) -> StorageMap {
    let adapter = |kind: ResourceKind| -> Arc<dyn RestStorage> {
        match kind {
            ResourceKind::Pods => Arc::new(PodStorage::new(
                Arc::clone(&registries.pods),
                Arc::clone(pod_cache),
                Arc::clone(&config.pod_info),
                config.cloud.as_ref(),
            )),
            ResourceKind::ReplicationControllers => Arc::new(ControllerStorage::new(
                Arc::clone(&registries.controllers),
                Arc::clone(&registries.pods),
            )),
            ResourceKind::Services => Arc::new(ServiceStorage::new(
                Arc::clone(&registries.services),
                Arc::clone(&registries.nodes),
                config.cloud.clone(),
            )),
            ResourceKind::Endpoints => {
                Arc::new(EndpointStorage::new(Arc::clone(&registries.endpoints)))
            }
            ResourceKind::Minions => Arc::new(NodeStorage::new(Arc::clone(&registries.nodes))),
            ResourceKind::Events => Arc::new(EventStorage::new(Arc::clone(&registries.events))),
            ResourceKind::Bindings => Arc::new(BindingStorage::new(
                Arc::clone(&registries.bindings),
                Arc::clone(&registries.pods),
                Arc::clone(&registries.manifests),
            )),
        }
    };
    ResourceKind::ALL
        .into_iter()
        .map(|kind| (kind.as_str().to_owned(), adapter(kind)))
        .collect()
}

/// The assembled control-plane core.
pub struct Master {
    registries: RegistrySet,
    pod_cache: Arc<PodCache>,
    storage: StorageMap,
    roots: HashMap<ApiVersion, String>,
    self_linker: Arc<dyn SelfLinker>,
}

impl Master {
    /// Assembles the master and starts the pod-cache refresh.
    ///
    /// Steps run in order: node registry, remaining registries, pod cache and
    /// its refresh task, storage map. The refresh handle is returned so the
    /// caller decides whether to stop it or let it run for the process
    /// lifetime.
    pub fn new(
        config: MasterConfig,
        reporter: &dyn StatusReporter,
    ) -> Result<(Self, RefreshHandle), MasterError> {
        let nodes: Arc<dyn NodeRegistry> = Arc::from(build_node_registry(&config, reporter)?);
        let registries = RegistrySet::new(
            Arc::clone(&config.storage),
            nodes,
            config.settings.event_ttl(),
        );

        let pod_cache = Arc::new(PodCache::new(
            Arc::clone(&config.pod_info),
            Arc::clone(&registries.pods),
        ));
        let refreshed = Arc::clone(&pod_cache);
        let refresher = spawn_periodic(POD_CACHE_TASK, POD_CACHE_REFRESH_INTERVAL, move || {
            refreshed.update_all_containers();
        })
        .map_err(|source| MasterError::Refresh { source })?;
        reporter.refresh_started(refresher.name(), refresher.interval());

        let storage = assemble_storage(&registries, &pod_cache, &config);
        let roots = HashMap::from([
            (ApiVersion::V1Beta1, config.settings.v1beta1_root.clone()),
            (ApiVersion::V1Beta2, config.settings.v1beta2_root.clone()),
        ]);

        let master = Self {
            registries,
            pod_cache,
            storage,
            roots,
            self_linker: Arc::new(JsonSelfLinker),
        };
        Ok((master, refresher))
    }

    /// Registries backing the storage map.
    #[must_use]
    pub fn registries(&self) -> &RegistrySet {
        &self.registries
    }

    /// The pod cache refreshed in the background.
    #[must_use]
    pub fn pod_cache(&self) -> &Arc<PodCache> {
        &self.pod_cache
    }

    /// The decorated node registry.
    #[must_use]
    pub fn node_registry(&self) -> &Arc<dyn NodeRegistry> {
        &self.registries.nodes
    }

    /// Root path served for `version`.
    #[must_use]
    pub fn root(&self, version: ApiVersion) -> &str {
        self.roots.get(&version).map_or("", String::as_str)
    }

    /// Exports the API for `version`.
    ///
    /// Each call returns a fresh copy of the storage map; the self-linker is
    /// the same instance for every version.
    #[must_use]
    pub fn api(&self, version: ApiVersion) -> ApiGroup {
        ApiGroup {
            storage: self.storage.clone(),
            codec: Arc::new(JsonCodec::new(version)),
            root: self.root(version).to_owned(),
            self_linker: Arc::clone(&self.self_linker),
        }
    }

    /// Exports the `v1beta1` API.
    #[must_use]
    pub fn api_v1beta1(&self) -> ApiGroup {
        self.api(ApiVersion::V1Beta1)
    }

    /// Exports the `v1beta2` API.
    #[must_use]
    pub fn api_v1beta2(&self) -> ApiGroup {
        self.api(ApiVersion::V1Beta2)
    }
}

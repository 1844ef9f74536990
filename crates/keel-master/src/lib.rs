//! Bootstrap and composition core of the keel control-plane master.
//!
//! Given settings from [`keel_config`] and a handful of runtime collaborators
//! (storage backend, optional cloud provider, node health checker, pod-info
//! source), the master:
//!
//! - builds the node registry as a chain of optional decorators over a static
//!   or cloud-discovered base, with health filtering inside and caching
//!   outermost;
//! - builds one storage-backed registry for every other resource kind;
//! - starts a background task refreshing cached pod container state every
//!   [`POD_CACHE_REFRESH_INTERVAL`];
//! - maps each resource kind to a REST storage adapter and exports that map
//!   once per API version.
//!
//! Degradable failures (cloud discovery, node caching) fall back to a simpler
//! registry chain and are only visible through the [`StatusReporter`]. A node
//! that cannot be registered from configuration aborts construction. Nothing
//! that goes wrong inside a refresh pass stops the refresh loop.

pub mod api;
mod apiserver;
mod bootstrap;
pub mod clock;
pub mod cloud;
mod master;
pub mod node;
mod pod_cache;
mod process;
mod refresh;
pub mod registry;
pub mod rest;
mod status;
pub mod storage;
mod telemetry;

pub use apiserver::{
    ApiGroup, ApiVersion, Codec, CodecError, JsonCodec, JsonSelfLinker, SelfLinker, StorageMap,
};
pub use bootstrap::{
    BootstrapError, Bootstrapped, Collaborators, ConfigLoader, StaticConfigLoader,
    SystemConfigLoader, bootstrap_with,
};
pub use master::{
    HEALTH_CHECK_TIMEOUT, Master, MasterConfig, MasterError, POD_CACHE_REFRESH_INTERVAL,
    RegistrySet, assemble_storage,
};
pub use pod_cache::{PodCache, PodInfoError, PodInfoGetter, UnavailablePodInfo};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_master,
    run_master_with,
};
pub use refresh::{RefreshError, RefreshHandle, spawn_periodic};
pub use status::{StatusReporter, StructuredStatusReporter};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;

//! Storage-bound registries for every resource kind.
//!
//! Each registry is a thin typed view over the shared [`StorageBackend`]:
//! objects are encoded as JSON under `/registry/<kind>/<id>`. None of these
//! registries are decorated; only the node registry gains extra layers (see
//! [`crate::node`]).

mod backend;
mod errors;
mod manifest;

pub use backend::{
    BackendRegistry, BindingRegistry, ControllerRegistry, EndpointRegistry, EventRegistry,
    PodRegistry, ServiceRegistry,
};
pub use errors::RegistryError;
pub use manifest::{BasicManifestFactory, ManifestFactory, service_environment};

pub(crate) const REGISTRY_TARGET: &str = "keel_master::registry";

//! Generic storage-backed registry.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::api::{Binding, Endpoints, Event, Pod, ReplicationController, Resource, Service};
use crate::storage::StorageBackend;

use super::{ManifestFactory, REGISTRY_TARGET, RegistryError};

/// Typed registry persisting `T` through a [`StorageBackend`].
pub struct BackendRegistry<T> {
    storage: Arc<dyn StorageBackend>,
    ttl: Option<Duration>,
    _marker: PhantomData<fn() -> T>,
}

/// Registry of pods.
pub type PodRegistry = BackendRegistry<Pod>;
/// Registry of replication controllers.
pub type ControllerRegistry = BackendRegistry<ReplicationController>;
/// Registry of services.
pub type ServiceRegistry = BackendRegistry<Service>;
/// Registry of endpoints.
pub type EndpointRegistry = BackendRegistry<Endpoints>;
/// Registry of events; entries expire after the configured TTL.
pub type EventRegistry = BackendRegistry<Event>;
/// Registry of pod bindings.
pub type BindingRegistry = BackendRegistry<Binding>;

impl<T: Resource> BackendRegistry<T> {
    /// Builds a registry whose entries never expire.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            ttl: None,
            _marker: PhantomData,
        }
    }

    /// Builds a registry whose created entries expire after `ttl`.
    ///
    /// A zero TTL is treated as "never expire".
    #[must_use]
    pub fn with_ttl(storage: Arc<dyn StorageBackend>, ttl: Duration) -> Self {
        Self {
            storage,
            ttl: (!ttl.is_zero()).then_some(ttl),
            _marker: PhantomData,
        }
    }

    /// Time-to-live applied to created entries.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn key(id: &str) -> String {
        format!("{}{id}", T::KIND.key_prefix())
    }

    fn encode(object: &T) -> Result<Vec<u8>, RegistryError> {
        serde_json::to_vec(object).map_err(|source| RegistryError::Codec {
            kind: T::KIND,
            source,
        })
    }

    fn decode(bytes: &[u8]) -> Result<T, RegistryError> {
        serde_json::from_slice(bytes).map_err(|source| RegistryError::Codec {
            kind: T::KIND,
            source,
        })
    }

    /// Stores a new object.
    pub fn create(&self, object: &T) -> Result<(), RegistryError> {
        let id = object.id();
        let bytes = Self::encode(object)?;
        self.storage
            .create(&Self::key(id), bytes, self.ttl)
            .map_err(|source| RegistryError::from_storage(T::KIND, id, source))
    }

    /// Stores `object`, replacing whatever is stored under its name.
    pub fn put(&self, object: &T) -> Result<(), RegistryError> {
        let id = object.id();
        let bytes = Self::encode(object)?;
        self.storage
            .set(&Self::key(id), bytes)
            .map_err(|source| RegistryError::from_storage(T::KIND, id, source))
    }

    /// Replaces an existing object.
    pub fn update(&self, object: &T) -> Result<(), RegistryError> {
        let id = object.id();
        self.get(id)?;
        let bytes = Self::encode(object)?;
        self.storage
            .set(&Self::key(id), bytes)
            .map_err(|source| RegistryError::from_storage(T::KIND, id, source))
    }

    /// Fetches a single object.
    pub fn get(&self, id: &str) -> Result<T, RegistryError> {
        let bytes = self
            .storage
            .get(&Self::key(id))
            .map_err(|source| RegistryError::from_storage(T::KIND, id, source))?
            .ok_or_else(|| RegistryError::not_found(T::KIND, id))?;
        Self::decode(&bytes)
    }

    /// Lists every stored object ordered by name.
    pub fn list(&self) -> Result<Vec<T>, RegistryError> {
        let prefix = T::KIND.key_prefix();
        self.storage
            .list(&prefix)
            .map_err(|source| RegistryError::Storage { source })?
            .iter()
            .map(|bytes| Self::decode(bytes))
            .collect()
    }

    /// Removes an object.
    pub fn delete(&self, id: &str) -> Result<(), RegistryError> {
        self.storage
            .delete(&Self::key(id))
            .map_err(|source| RegistryError::from_storage(T::KIND, id, source))
    }
}

impl BindingRegistry {
    /// Assigns the pod to the bound host and records the binding.
    ///
    /// The pod is updated first, with a manifest from `manifests`. A binding
    /// overwrites any earlier one for the same pod name. When the binding
    /// cannot be stored the pod is restored to its previous state.
    pub fn apply(
        &self,
        binding: &Binding,
        pods: &PodRegistry,
        manifests: &dyn ManifestFactory,
    ) -> Result<(), RegistryError> {
        let previous = pods.get(&binding.pod_id)?;
        let manifest = manifests.make_manifest(&binding.host, &previous)?;
        let bound = Pod {
            host: Some(binding.host.clone()),
            manifest: Some(manifest),
            ..previous.clone()
        };
        pods.update(&bound)?;

        if let Err(error) = self.put(binding) {
            if let Err(restore) = pods.update(&previous) {
                warn!(
                    target: REGISTRY_TARGET,
                    pod = %previous.id,
                    error = %restore,
                    "failed to restore pod after a rejected binding"
                );
            }
            return Err(error);
        }
        Ok(())
    }
}

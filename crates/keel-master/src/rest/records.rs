//! Adapters that pass objects straight through to their registry.

use std::sync::Arc;

use serde_json::Value;

use crate::api::{Binding, Endpoints, Event, Resource, ResourceKind};
use crate::registry::{
    BindingRegistry, EndpointRegistry, EventRegistry, ManifestFactory, PodRegistry,
};

use super::{RestError, RestStorage, decode, encode, encode_all};

/// Read-only view of service endpoints.
pub struct EndpointStorage {
    endpoints: Arc<EndpointRegistry>,
}

impl EndpointStorage {
    /// Builds the adapter.
    #[must_use]
    pub fn new(endpoints: Arc<EndpointRegistry>) -> Self {
        Self { endpoints }
    }
}

impl RestStorage for EndpointStorage {
    fn kind(&self) -> ResourceKind {
        Endpoints::KIND
    }

    fn list(&self) -> Result<Vec<Value>, RestError> {
        encode_all(Endpoints::KIND, &self.endpoints.list()?)
    }

    fn get(&self, id: &str) -> Result<Value, RestError> {
        encode(Endpoints::KIND, &self.endpoints.get(id)?)
    }
}

/// Serves cluster events; stored entries expire with the registry TTL.
pub struct EventStorage {
    events: Arc<EventRegistry>,
}

impl EventStorage {
    /// Builds the adapter.
    #[must_use]
    pub fn new(events: Arc<EventRegistry>) -> Self {
        Self { events }
    }
}

impl RestStorage for EventStorage {
    fn kind(&self) -> ResourceKind {
        Event::KIND
    }

    fn list(&self) -> Result<Vec<Value>, RestError> {
        encode_all(Event::KIND, &self.events.list()?)
    }

    fn get(&self, id: &str) -> Result<Value, RestError> {
        encode(Event::KIND, &self.events.get(id)?)
    }

    fn create(&self, object: Value) -> Result<Value, RestError> {
        let event: Event = decode(Event::KIND, object)?;
        self.events.create(&event)?;
        encode(Event::KIND, &event)
    }

    fn delete(&self, id: &str) -> Result<(), RestError> {
        Ok(self.events.delete(id)?)
    }
}

/// Create-only endpoint assigning pods to hosts.
pub struct BindingStorage {
    bindings: Arc<BindingRegistry>,
    pods: Arc<PodRegistry>,
    manifests: Arc<dyn ManifestFactory>,
}

impl BindingStorage {
    /// Builds the adapter; bound pods receive a manifest from `manifests`.
    #[must_use]
    pub fn new(
        bindings: Arc<BindingRegistry>,
        pods: Arc<PodRegistry>,
        manifests: Arc<dyn ManifestFactory>,
    ) -> Self {
        Self {
            bindings,
            pods,
            manifests,
        }
    }
}

impl RestStorage for BindingStorage {
    fn kind(&self) -> ResourceKind {
        Binding::KIND
    }

    fn create(&self, object: Value) -> Result<Value, RestError> {
        let binding: Binding = decode(Binding::KIND, object)?;
        self.bindings
            .apply(&binding, &self.pods, self.manifests.as_ref())?;
        encode(Binding::KIND, &binding)
    }
}

//! REST storage adapters, one per resource kind.
//!
//! An adapter translates generic JSON requests into calls on a typed registry.
//! Adapters are built once during master assembly and do no I/O until a
//! request arrives.

mod controllers;
mod errors;
mod nodes;
mod pods;
mod records;
mod services;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::ResourceKind;

pub use controllers::ControllerStorage;
pub use errors::RestError;
pub use nodes::NodeStorage;
pub use pods::PodStorage;
pub use records::{BindingStorage, EndpointStorage, EventStorage};
pub use services::ServiceStorage;

pub(crate) const REST_TARGET: &str = "keel_master::rest";

/// Verbs a REST storage may serve.
///
/// Every verb defaults to [`RestError::MethodNotSupported`] so read-only and
/// create-only adapters only implement what they serve.
pub trait RestStorage: Send + Sync {
    /// Kind served by this adapter.
    fn kind(&self) -> ResourceKind;

    /// Lists every object.
    fn list(&self) -> Result<Vec<Value>, RestError> {
        Err(RestError::unsupported(self.kind(), "list"))
    }

    /// Fetches one object.
    fn get(&self, id: &str) -> Result<Value, RestError> {
        let _ = id;
        Err(RestError::unsupported(self.kind(), "get"))
    }

    /// Creates an object and returns it as stored.
    fn create(&self, object: Value) -> Result<Value, RestError> {
        let _ = object;
        Err(RestError::unsupported(self.kind(), "create"))
    }

    /// Deletes an object.
    fn delete(&self, id: &str) -> Result<(), RestError> {
        let _ = id;
        Err(RestError::unsupported(self.kind(), "delete"))
    }
}

fn encode<T: Serialize>(kind: ResourceKind, object: &T) -> Result<Value, RestError> {
    serde_json::to_value(object).map_err(|source| RestError::Encode { kind, source })
}

fn decode<T: DeserializeOwned>(kind: ResourceKind, object: Value) -> Result<T, RestError> {
    serde_json::from_value(object).map_err(|source| RestError::InvalidObject { kind, source })
}

fn encode_all<T: Serialize>(kind: ResourceKind, objects: &[T]) -> Result<Vec<Value>, RestError> {
    objects.iter().map(|object| encode(kind, object)).collect()
}

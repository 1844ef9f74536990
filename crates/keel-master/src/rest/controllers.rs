use std::sync::Arc;

use serde_json::Value;

use crate::api::{Pod, ReplicationController, Resource, ResourceKind, selector_matches};
use crate::registry::{ControllerRegistry, PodRegistry};

use super::{RestError, RestStorage, decode, encode, encode_all};

/// Serves replication controllers with their observed replica count.
pub struct ControllerStorage {
    controllers: Arc<ControllerRegistry>,
    pods: Arc<PodRegistry>,
}

impl ControllerStorage {
    /// Builds the adapter.
    #[must_use]
    pub fn new(controllers: Arc<ControllerRegistry>, pods: Arc<PodRegistry>) -> Self {
        Self { controllers, pods }
    }

    fn with_current_replicas(controller: &mut ReplicationController, pods: &[Pod]) {
        let matching = pods
            .iter()
            .filter(|pod| selector_matches(&controller.selector, &pod.labels))
            .count();
        controller.current_replicas = u32::try_from(matching).unwrap_or(u32::MAX);
    }
}

impl RestStorage for ControllerStorage {
    fn kind(&self) -> ResourceKind {
        ReplicationController::KIND
    }

    fn list(&self) -> Result<Vec<Value>, RestError> {
        let pods = self.pods.list()?;
        let mut controllers = self.controllers.list()?;
        for controller in &mut controllers {
            Self::with_current_replicas(controller, &pods);
        }
        encode_all(ReplicationController::KIND, &controllers)
    }

    fn get(&self, id: &str) -> Result<Value, RestError> {
        let mut controller = self.controllers.get(id)?;
        Self::with_current_replicas(&mut controller, &self.pods.list()?);
        encode(ReplicationController::KIND, &controller)
    }

    fn create(&self, object: Value) -> Result<Value, RestError> {
        let mut controller: ReplicationController = decode(ReplicationController::KIND, object)?;
        controller.current_replicas = 0;
        self.controllers.create(&controller)?;
        encode(ReplicationController::KIND, &controller)
    }

    fn delete(&self, id: &str) -> Result<(), RestError> {
        Ok(self.controllers.delete(id)?)
    }
}

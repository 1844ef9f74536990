use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::api::{Resource, ResourceKind, Service};
use crate::cloud::{CloudError, CloudProvider, TcpLoadBalancer};
use crate::node::NodeRegistry;
use crate::registry::ServiceRegistry;

use super::{REST_TARGET, RestError, RestStorage, decode, encode, encode_all};

/// Serves services and provisions external load balancers on request.
pub struct ServiceStorage {
    services: Arc<ServiceRegistry>,
    nodes: Arc<dyn NodeRegistry>,
    cloud: Option<Arc<dyn CloudProvider>>,
}

impl ServiceStorage {
    /// Builds the adapter.
    #[must_use]
    pub fn new(
        services: Arc<ServiceRegistry>,
        nodes: Arc<dyn NodeRegistry>,
        cloud: Option<Arc<dyn CloudProvider>>,
    ) -> Self {
        Self {
            services,
            nodes,
            cloud,
        }
    }

    fn load_balancer(&self) -> Result<Arc<dyn TcpLoadBalancer>, CloudError> {
        let cloud = self
            .cloud
            .as_ref()
            .ok_or_else(|| CloudError::new("no cloud provider is configured"))?;
        cloud.tcp_load_balancer().ok_or_else(|| {
            CloudError::new(format!(
                "cloud provider '{}' does not support load balancers",
                cloud.name()
            ))
        })
    }

    fn provision(&self, service: &Service) -> Result<(), RestError> {
        let balancer = self.load_balancer()?;
        let hosts: Vec<String> = self
            .nodes
            .list_nodes()?
            .into_iter()
            .map(|node| node.id)
            .collect();
        balancer.create(&service.id, service.port, &hosts)?;
        Ok(())
    }
}

impl RestStorage for ServiceStorage {
    fn kind(&self) -> ResourceKind {
        Service::KIND
    }

    fn list(&self) -> Result<Vec<Value>, RestError> {
        encode_all(Service::KIND, &self.services.list()?)
    }

    fn get(&self, id: &str) -> Result<Value, RestError> {
        encode(Service::KIND, &self.services.get(id)?)
    }

    fn create(&self, object: Value) -> Result<Value, RestError> {
        let service: Service = decode(Service::KIND, object)?;
        self.services.create(&service)?;
        if service.create_external_load_balancer {
            if let Err(error) = self.provision(&service) {
                if let Err(rollback) = self.services.delete(&service.id) {
                    warn!(
                        target: REST_TARGET,
                        service = %service.id,
                        error = %rollback,
                        "failed to remove service after load balancer provisioning failed"
                    );
                }
                return Err(error);
            }
        }
        encode(Service::KIND, &service)
    }

    fn delete(&self, id: &str) -> Result<(), RestError> {
        let service = self.services.get(id)?;
        if service.create_external_load_balancer {
            self.load_balancer()?.delete(&service.id)?;
        }
        Ok(self.services.delete(id)?)
    }
}

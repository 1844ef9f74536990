//! Node registry backed by cloud instance discovery.

use std::sync::Arc;

use crate::api::{Node, NodeResources, ResourceKind};
use crate::cloud::{CloudError, CloudProvider, Instances};
use crate::registry::RegistryError;

use super::{NodeRegistry, RegistryLayer};

/// Lists the cloud instances whose names match a pattern.
///
/// Membership is owned by the cloud, so nodes cannot be created or deleted
/// through this registry.
pub struct CloudNodeRegistry {
    instances: Arc<dyn Instances>,
    pattern: String,
    resources: NodeResources,
}

impl CloudNodeRegistry {
    /// Builds a registry over the provider's instance API.
    ///
    /// Fails when the provider offers no instance discovery.
    pub fn new(
        cloud: &dyn CloudProvider,
        pattern: impl Into<String>,
        resources: NodeResources,
    ) -> Result<Self, RegistryError> {
        let instances = cloud.instances().ok_or_else(|| {
            RegistryError::from(CloudError::new(format!(
                "cloud provider '{}' does not support instance discovery",
                cloud.name()
            )))
        })?;
        Ok(Self {
            instances,
            pattern: pattern.into(),
            resources,
        })
    }

    /// Pattern instance names are matched against.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl NodeRegistry for CloudNodeRegistry {
    fn create_node(&self, _node: &Node) -> Result<(), RegistryError> {
        Err(RegistryError::unsupported("cloud", "create"))
    }

    fn list_nodes(&self) -> Result<Vec<Node>, RegistryError> {
        let names = self.instances.list(&self.pattern)?;
        Ok(names
            .into_iter()
            .map(|name| Node::new(name, self.resources))
            .collect())
    }

    fn get_node(&self, id: &str) -> Result<Node, RegistryError> {
        self.list_nodes()?
            .into_iter()
            .find(|node| node.id == id)
            .ok_or_else(|| RegistryError::not_found(ResourceKind::Minions, id))
    }

    fn delete_node(&self, _id: &str) -> Result<(), RegistryError> {
        Err(RegistryError::unsupported("cloud", "delete"))
    }

    fn layer(&self) -> RegistryLayer {
        RegistryLayer::CloudDiscovered
    }
}

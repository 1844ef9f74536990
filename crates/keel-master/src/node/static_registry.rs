//! Storage-backed node registry.

use std::sync::Arc;

use crate::api::Node;
use crate::registry::{BackendRegistry, RegistryError};
use crate::storage::StorageBackend;

use super::{NodeRegistry, RegistryLayer};

/// Node registry persisted in the shared storage backend.
pub struct StaticNodeRegistry {
    nodes: BackendRegistry<Node>,
}

impl StaticNodeRegistry {
    /// Builds an empty registry over `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            nodes: BackendRegistry::new(storage),
        }
    }
}

impl NodeRegistry for StaticNodeRegistry {
    fn create_node(&self, node: &Node) -> Result<(), RegistryError> {
        self.nodes.create(node)
    }

    fn list_nodes(&self) -> Result<Vec<Node>, RegistryError> {
        self.nodes.list()
    }

    fn get_node(&self, id: &str) -> Result<Node, RegistryError> {
        self.nodes.get(id)
    }

    fn delete_node(&self, id: &str) -> Result<(), RegistryError> {
        self.nodes.delete(id)
    }

    fn layer(&self) -> RegistryLayer {
        RegistryLayer::Static
    }
}

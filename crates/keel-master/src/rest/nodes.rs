use std::sync::Arc;

use serde_json::Value;

use crate::api::{Node, Resource, ResourceKind};
use crate::node::NodeRegistry;

use super::{RestError, RestStorage, decode, encode, encode_all};

/// Serves nodes through the decorated node registry.
pub struct NodeStorage {
    nodes: Arc<dyn NodeRegistry>,
}

impl NodeStorage {
    /// Builds the adapter.
    #[must_use]
    pub fn new(nodes: Arc<dyn NodeRegistry>) -> Self {
        Self { nodes }
    }
}

impl RestStorage for NodeStorage {
    fn kind(&self) -> ResourceKind {
        Node::KIND
    }

    fn list(&self) -> Result<Vec<Value>, RestError> {
        encode_all(Node::KIND, &self.nodes.list_nodes()?)
    }

    fn get(&self, id: &str) -> Result<Value, RestError> {
        encode(Node::KIND, &self.nodes.get_node(id)?)
    }

    fn create(&self, object: Value) -> Result<Value, RestError> {
        let node: Node = decode(Node::KIND, object)?;
        self.nodes.create_node(&node)?;
        encode(Node::KIND, &node)
    }

    fn delete(&self, id: &str) -> Result<(), RestError> {
        Ok(self.nodes.delete_node(id)?)
    }
}

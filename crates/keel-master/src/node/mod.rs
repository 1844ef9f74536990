//! Node (minion) registry and its decorators.
//!
//! The node registry is the only registry the master decorates. A base source
//! (static storage-backed or cloud-discovered) may be wrapped by a health
//! filter, and the result may in turn be wrapped by a TTL cache. Each
//! decorator owns the registry it wraps and forwards calls to it; the chain is
//! inspectable through [`NodeRegistry::layer`] and [`NodeRegistry::inner`] so
//! callers can tell which composition is active.

mod builder;
mod caching;
mod cloud;
mod healthy;
mod static_registry;

use std::fmt;
use std::time::Duration;

use crate::api::Node;
use crate::registry::RegistryError;

pub use builder::build_node_registry;
pub use caching::{CacheSetupFailure, CachingNodeRegistry};
pub use cloud::CloudNodeRegistry;
pub use healthy::{HealthChecker, HealthStatus, HealthyNodeRegistry, TcpHealthChecker};
pub use static_registry::StaticNodeRegistry;

/// Identifies one layer of a node-registry chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryLayer {
    /// Storage-backed registry populated from configuration.
    Static,
    /// Registry backed by cloud instance discovery.
    CloudDiscovered,
    /// Decorator hiding unhealthy nodes.
    HealthFiltered,
    /// Decorator serving reads from a time-bounded snapshot.
    Cached,
}

impl fmt::Display for RegistryLayer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Static => "static",
            Self::CloudDiscovered => "cloud",
            Self::HealthFiltered => "healthy",
            Self::Cached => "cached",
        };
        formatter.write_str(label)
    }
}

/// Capability set shared by every node-registry variant.
pub trait NodeRegistry: Send + Sync {
    /// Registers a node.
    fn create_node(&self, node: &Node) -> Result<(), RegistryError>;

    /// Lists the nodes visible through this layer.
    fn list_nodes(&self) -> Result<Vec<Node>, RegistryError>;

    /// Fetches a single node.
    fn get_node(&self, id: &str) -> Result<Node, RegistryError>;

    /// Removes a node.
    fn delete_node(&self, id: &str) -> Result<(), RegistryError>;

    /// Which variant this layer is.
    fn layer(&self) -> RegistryLayer;

    /// The wrapped registry, for decorators.
    fn inner(&self) -> Option<&dyn NodeRegistry> {
        None
    }

    /// Probes the named node when a health-filtering layer is present in the
    /// chain; `None` otherwise.
    fn node_health(&self, id: &str) -> Option<HealthStatus> {
        self.inner().and_then(|inner| inner.node_health(id))
    }

    /// Snapshot lifetime of the caching layer, when one is in the chain.
    fn cache_ttl(&self) -> Option<Duration> {
        self.inner().and_then(|inner| inner.cache_ttl())
    }
}

/// Walks a registry chain, outermost layer first.
#[must_use]
pub fn node_chain(registry: &dyn NodeRegistry) -> Vec<RegistryLayer> {
    let mut layers = vec![registry.layer()];
    let mut current = registry.inner();
    while let Some(next) = current {
        layers.push(next.layer());
        current = next.inner();
    }
    layers
}

/// Renders a chain as `cached(healthy(static))`.
#[must_use]
pub fn describe_chain(layers: &[RegistryLayer]) -> String {
    let mut rendered = String::new();
    for (index, layer) in layers.iter().enumerate() {
        if index > 0 {
            rendered.push('(');
        }
        rendered.push_str(&layer.to_string());
    }
    rendered.push_str(&")".repeat(layers.len().saturating_sub(1)));
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(&[RegistryLayer::Static], "static")]
    #[case(&[RegistryLayer::HealthFiltered, RegistryLayer::Static], "healthy(static)")]
    #[case(
        &[RegistryLayer::Cached, RegistryLayer::HealthFiltered, RegistryLayer::CloudDiscovered],
        "cached(healthy(cloud))"
    )]
    fn describes_chains(#[case] layers: &[RegistryLayer], #[case] expected: &str) {
        assert_eq!(describe_chain(layers), expected);
    }
}

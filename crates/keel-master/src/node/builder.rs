//! Assembly of the node-registry chain from configuration.

use std::sync::Arc;

use crate::api::{Node, NodeResources};
use crate::master::{MasterConfig, MasterError};
use crate::registry::RegistryError;
use crate::status::StatusReporter;
use crate::storage::StorageBackend;

use super::{
    CachingNodeRegistry, CloudNodeRegistry, HealthyNodeRegistry, NodeRegistry, StaticNodeRegistry,
    node_chain,
};

/// Builds the node registry the rest of the master will observe.
///
/// The base is cloud-discovered when a cloud provider and a node pattern are
/// both configured and the provider supports discovery; otherwise it is a
/// static registry seeded with the configured node names. The base is then
/// optionally wrapped by the health filter and, outermost, by the TTL cache.
///
/// Discovery and cache failures degrade to the simpler chain and are reported
/// through `reporter`. A static node that is already registered is kept as
/// is; any other failure to seed one is fatal.
pub fn build_node_registry(
    config: &MasterConfig,
    reporter: &dyn StatusReporter,
) -> Result<Box<dyn NodeRegistry>, MasterError> {
    let settings = &config.settings;
    let resources = NodeResources {
        milli_cpu: settings.node_milli_cpu,
        memory_bytes: settings.node_memory_bytes,
    };

    let base = discover_from_cloud(config, resources, reporter);
    let mut registry: Box<dyn NodeRegistry> = match base {
        Some(cloud) => cloud,
        None => Box::new(seed_static(
            Arc::clone(&config.storage),
            &settings.nodes,
            resources,
        )?),
    };

    if settings.health_check_nodes {
        registry = Box::new(HealthyNodeRegistry::new(
            registry,
            config.health_checker.clone(),
        ));
    }

    let ttl = settings.node_cache_ttl();
    if !ttl.is_zero() {
        registry = match CachingNodeRegistry::new(registry, ttl, config.clock.clone()) {
            Ok(cached) => Box::new(cached),
            Err(failure) => {
                reporter.node_cache_failed(failure.error());
                let (uncached, _) = failure.into_parts();
                uncached
            }
        };
    }

    reporter.node_registry_ready(&node_chain(registry.as_ref()));
    Ok(registry)
}

fn discover_from_cloud(
    config: &MasterConfig,
    resources: NodeResources,
    reporter: &dyn StatusReporter,
) -> Option<Box<dyn NodeRegistry>> {
    let cloud = config.cloud.as_ref()?;
    if !config.settings.has_node_pattern() {
        return None;
    }
    match CloudNodeRegistry::new(cloud.as_ref(), &config.settings.node_pattern, resources) {
        Ok(registry) => Some(Box::new(registry)),
        Err(error) => {
            reporter.node_discovery_failed(&error);
            None
        }
    }
}

fn seed_static(
    storage: Arc<dyn StorageBackend>,
    ids: &[String],
    resources: NodeResources,
) -> Result<StaticNodeRegistry, MasterError> {
    let registry = StaticNodeRegistry::new(storage);
    for id in ids {
        match registry.create_node(&Node::new(id.clone(), resources)) {
            // Already registered by an earlier run over the same storage.
            Ok(()) | Err(RegistryError::AlreadyExists { .. }) => {}
            Err(source) => {
                return Err(MasterError::StaticNode {
                    id: id.clone(),
                    source,
                });
            }
        }
    }
    Ok(registry)
}

//! TTL-caching node-registry decorator.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::api::{Node, ResourceKind};
use crate::clock::Clock;
use crate::registry::RegistryError;

use super::{NodeRegistry, RegistryLayer};

struct Snapshot {
    nodes: Vec<Node>,
    fetched_at: Option<Instant>,
}

/// Serves node reads from a listing no older than the configured TTL.
///
/// Reads that find the snapshot stale refresh it from the wrapped registry.
/// Writes go straight through and invalidate the snapshot.
pub struct CachingNodeRegistry {
    inner: Box<dyn NodeRegistry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    snapshot: Mutex<Snapshot>,
}

/// Returned when the cache cannot be primed; hands the wrapped registry back.
pub struct CacheSetupFailure {
    registry: Box<dyn NodeRegistry>,
    error: RegistryError,
}

impl CacheSetupFailure {
    /// The error raised while priming the cache.
    #[must_use]
    pub fn error(&self) -> &RegistryError {
        &self.error
    }

    /// Splits the failure into the untouched registry and the error.
    #[must_use]
    pub fn into_parts(self) -> (Box<dyn NodeRegistry>, RegistryError) {
        (self.registry, self.error)
    }
}

impl fmt::Debug for CacheSetupFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CacheSetupFailure")
            .field("layer", &self.registry.layer())
            .field("error", &self.error)
            .finish()
    }
}

impl CachingNodeRegistry {
    /// Wraps `inner` and primes the cache with one listing.
    ///
    /// Fails when the TTL is zero or the priming listing fails; the wrapped
    /// registry is returned unchanged inside the failure.
    pub fn new(
        inner: Box<dyn NodeRegistry>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheSetupFailure> {
        if ttl.is_zero() {
            return Err(CacheSetupFailure {
                registry: inner,
                error: RegistryError::unsupported("cached", "a zero ttl"),
            });
        }
        let nodes = match inner.list_nodes() {
            Ok(nodes) => nodes,
            Err(error) => {
                return Err(CacheSetupFailure {
                    registry: inner,
                    error,
                });
            }
        };
        let fetched_at = Some(clock.now());
        Ok(Self {
            inner,
            ttl,
            clock,
            snapshot: Mutex::new(Snapshot { nodes, fetched_at }),
        })
    }

    /// Lifetime of a snapshot.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fresh_nodes(&self) -> Result<Vec<Node>, RegistryError> {
        let now = self.clock.now();
        let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = snapshot
            .fetched_at
            .is_some_and(|fetched| now.saturating_duration_since(fetched) < self.ttl);
        if !fresh {
            snapshot.nodes = self.inner.list_nodes()?;
            snapshot.fetched_at = Some(now);
        }
        Ok(snapshot.nodes.clone())
    }

    fn invalidate(&self) {
        let mut snapshot = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        snapshot.fetched_at = None;
    }
}

impl fmt::Debug for CachingNodeRegistry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CachingNodeRegistry")
            .field("inner", &self.inner.layer())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl NodeRegistry for CachingNodeRegistry {
    fn create_node(&self, node: &Node) -> Result<(), RegistryError> {
        let result = self.inner.create_node(node);
        self.invalidate();
        result
    }

    fn list_nodes(&self) -> Result<Vec<Node>, RegistryError> {
        self.fresh_nodes()
    }

    fn get_node(&self, id: &str) -> Result<Node, RegistryError> {
        self.fresh_nodes()?
            .into_iter()
            .find(|node| node.id == id)
            .ok_or_else(|| RegistryError::not_found(ResourceKind::Minions, id))
    }

    fn delete_node(&self, id: &str) -> Result<(), RegistryError> {
        let result = self.inner.delete_node(id);
        self.invalidate();
        result
    }

    fn layer(&self) -> RegistryLayer {
        RegistryLayer::Cached
    }

    fn cache_ttl(&self) -> Option<Duration> {
        Some(self.ttl)
    }

    fn inner(&self) -> Option<&dyn NodeRegistry> {
        Some(self.inner.as_ref())
    }
}

//! Health-filtering node-registry decorator.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use crate::api::Node;
use crate::registry::RegistryError;

use super::{NodeRegistry, RegistryLayer};

/// Outcome of probing a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// The node answered the health check.
    Healthy,
    /// The node actively refused the health check.
    Unhealthy,
    /// The health check could not reach a verdict.
    Unknown,
}

/// Probes whether a node is serving.
#[cfg_attr(test, mockall::automock)]
pub trait HealthChecker: Send + Sync {
    /// Probes the node with the given host name.
    fn check(&self, host: &str) -> HealthStatus;
}

/// Probes nodes by opening a TCP connection to a fixed port.
#[derive(Debug, Clone, Copy)]
pub struct TcpHealthChecker {
    port: u16,
    timeout: Duration,
}

impl TcpHealthChecker {
    /// Builds a checker probing `port` with the given connect timeout.
    #[must_use]
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }
}

impl HealthChecker for TcpHealthChecker {
    fn check(&self, host: &str) -> HealthStatus {
        let Ok(mut addrs) = (host, self.port).to_socket_addrs() else {
            return HealthStatus::Unknown;
        };
        let Some(addr) = addrs.next() else {
            return HealthStatus::Unknown;
        };
        match TcpStream::connect_timeout(&addr, self.timeout) {
            Ok(_stream) => HealthStatus::Healthy,
            Err(error) if error.kind() == io::ErrorKind::ConnectionRefused => {
                HealthStatus::Unhealthy
            }
            Err(_) => HealthStatus::Unknown,
        }
    }
}

/// Hides nodes that fail their health check.
///
/// Listing keeps only nodes whose check reports [`HealthStatus::Healthy`]. A
/// direct lookup is rejected only for [`HealthStatus::Unhealthy`]; a node whose
/// check is inconclusive can still be fetched by name.
pub struct HealthyNodeRegistry {
    inner: Box<dyn NodeRegistry>,
    checker: Arc<dyn HealthChecker>,
}

impl HealthyNodeRegistry {
    /// Wraps `inner`, probing nodes with `checker`.
    #[must_use]
    pub fn new(inner: Box<dyn NodeRegistry>, checker: Arc<dyn HealthChecker>) -> Self {
        Self { inner, checker }
    }
}

impl NodeRegistry for HealthyNodeRegistry {
    fn create_node(&self, node: &Node) -> Result<(), RegistryError> {
        self.inner.create_node(node)
    }

    fn list_nodes(&self) -> Result<Vec<Node>, RegistryError> {
        Ok(self
            .inner
            .list_nodes()?
            .into_iter()
            .filter(|node| self.checker.check(&node.id) == HealthStatus::Healthy)
            .collect())
    }

    fn get_node(&self, id: &str) -> Result<Node, RegistryError> {
        let node = self.inner.get_node(id)?;
        match self.checker.check(&node.id) {
            HealthStatus::Unhealthy => Err(RegistryError::Unhealthy { id: node.id }),
            HealthStatus::Healthy | HealthStatus::Unknown => Ok(node),
        }
    }

    fn delete_node(&self, id: &str) -> Result<(), RegistryError> {
        self.inner.delete_node(id)
    }

    fn layer(&self) -> RegistryLayer {
        RegistryLayer::HealthFiltered
    }

    fn inner(&self) -> Option<&dyn NodeRegistry> {
        Some(self.inner.as_ref())
    }

    fn node_health(&self, id: &str) -> Option<HealthStatus> {
        Some(self.checker.check(id))
    }
}

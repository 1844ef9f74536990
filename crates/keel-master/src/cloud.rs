//! Cloud-provider seam.
//!
//! The master only needs three things from a cloud: listing instances that
//! match a name pattern, resolving an instance's address, and provisioning a
//! TCP load balancer. Providers expose each capability optionally, the same
//! way a provider without load-balancer support would.

use std::sync::Arc;

use thiserror::Error;

/// Errors reported by cloud providers.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CloudError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CloudError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Instance discovery offered by a cloud.
pub trait Instances: Send + Sync {
    /// Lists instance names matching `pattern`.
    fn list(&self, pattern: &str) -> Result<Vec<String>, CloudError>;

    /// Resolves the address of the named instance.
    fn ip_address(&self, name: &str) -> Result<String, CloudError>;
}

/// TCP load-balancer provisioning offered by a cloud.
pub trait TcpLoadBalancer: Send + Sync {
    /// Creates a load balancer named `name` forwarding `port` to `hosts`.
    fn create(&self, name: &str, port: u16, hosts: &[String]) -> Result<(), CloudError>;

    /// Removes the named load balancer.
    fn delete(&self, name: &str) -> Result<(), CloudError>;
}

/// Entry point to a cloud provider's optional capabilities.
pub trait CloudProvider: Send + Sync {
    /// Provider name used in diagnostics.
    fn name(&self) -> &str;

    /// Instance discovery, when supported.
    fn instances(&self) -> Option<Arc<dyn Instances>>;

    /// Load-balancer provisioning, when supported.
    fn tcp_load_balancer(&self) -> Option<Arc<dyn TcpLoadBalancer>>;
}

//! Structured status reporting for master lifecycle events.
//!
//! Degraded initialisation (cloud discovery or node caching falling back to a
//! simpler registry chain) is only visible through these events.

use std::sync::Arc;
use std::time::Duration;

use keel_config::Settings;

use crate::bootstrap::BootstrapError;
use crate::node::{RegistryLayer, describe_chain};
use crate::registry::RegistryError;

pub(crate) const STATUS_TARGET: &str = "keel_master::status";

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait StatusReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after the master has been assembled.
    fn bootstrap_succeeded(&self, settings: &Settings);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked when cloud node discovery could not be set up.
    fn node_discovery_failed(&self, error: &RegistryError);

    /// Invoked when the node cache could not be set up.
    fn node_cache_failed(&self, error: &RegistryError);

    /// Invoked once the node-registry chain is final, outermost layer first.
    fn node_registry_ready(&self, layers: &[RegistryLayer]);

    /// Invoked when a background refresh task starts.
    fn refresh_started(&self, task: &str, interval: Duration);
}

impl<T> StatusReporter for Arc<T>
where
    T: StatusReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, settings: &Settings) {
        (**self).bootstrap_succeeded(settings);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn node_discovery_failed(&self, error: &RegistryError) {
        (**self).node_discovery_failed(error);
    }

    fn node_cache_failed(&self, error: &RegistryError) {
        (**self).node_cache_failed(error);
    }

    fn node_registry_ready(&self, layers: &[RegistryLayer]) {
        (**self).node_registry_ready(layers);
    }

    fn refresh_started(&self, task: &str, interval: Duration) {
        (**self).refresh_started(task, interval);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredStatusReporter;

impl StructuredStatusReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl StatusReporter for StructuredStatusReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: STATUS_TARGET,
            event = "bootstrap_starting",
            "starting master bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, settings: &Settings) {
        tracing::info!(
            target: STATUS_TARGET,
            event = "bootstrap_succeeded",
            log_filter = %settings.log_filter(),
            log_format = ?settings.log_format(),
            static_nodes = settings.nodes.len(),
            "master bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: STATUS_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "master bootstrap failed"
        );
    }

    fn node_discovery_failed(&self, error: &RegistryError) {
        tracing::error!(
            target: STATUS_TARGET,
            event = "node_discovery_failed",
            error = %error,
            "failed to initialise cloud node registry, reverting to static registry"
        );
    }

    fn node_cache_failed(&self, error: &RegistryError) {
        tracing::error!(
            target: STATUS_TARGET,
            event = "node_cache_failed",
            error = %error,
            "failed to initialise node cache, serving uncached registry"
        );
    }

    fn node_registry_ready(&self, layers: &[RegistryLayer]) {
        tracing::info!(
            target: STATUS_TARGET,
            event = "node_registry_ready",
            chain = %describe_chain(layers),
            "node registry assembled"
        );
    }

    fn refresh_started(&self, task: &str, interval: Duration) {
        tracing::info!(
            target: STATUS_TARGET,
            event = "refresh_started",
            task,
            interval_ms = interval.as_millis(),
            "background refresh started"
        );
    }
}

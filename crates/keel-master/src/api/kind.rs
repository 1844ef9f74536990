//! The closed set of resource kinds served by the master.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Resource kinds exposed through the storage map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Scheduled workloads.
    Pods,
    /// Replication controllers keeping pod counts steady.
    ReplicationControllers,
    /// Network services fronting a set of pods.
    Services,
    /// Resolved service endpoints.
    Endpoints,
    /// Cluster member machines.
    Minions,
    /// Time-limited cluster events.
    Events,
    /// Pod-to-host assignments.
    Bindings,
}

impl ResourceKind {
    /// Every kind, in the order the storage map is assembled.
    pub const ALL: [Self; 7] = [
        Self::Pods,
        Self::ReplicationControllers,
        Self::Services,
        Self::Endpoints,
        Self::Minions,
        Self::Events,
        Self::Bindings,
    ];

    /// Path segment and storage-map key for the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pods => "pods",
            Self::ReplicationControllers => "replicationControllers",
            Self::Services => "services",
            Self::Endpoints => "endpoints",
            Self::Minions => "minions",
            Self::Events => "events",
            Self::Bindings => "bindings",
        }
    }

    /// Storage key prefix under which objects of this kind live.
    #[must_use]
    pub fn key_prefix(self) -> String {
        format!("/registry/{}/", self.as_str())
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned when parsing a resource kind fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported resource kind: {0}")]
pub struct ResourceKindParseError(String);

impl ResourceKindParseError {
    /// Returns the offending value that could not be parsed.
    #[must_use]
    pub fn value(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for ResourceKind {
    type Err = ResourceKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ResourceKindParseError(trimmed.to_owned()))
    }
}

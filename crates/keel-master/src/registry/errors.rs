//! Error type shared by every registry.

use thiserror::Error;

use crate::api::ResourceKind;
use crate::cloud::CloudError;
use crate::storage::StorageError;

/// Errors returned by registries, including the node-registry decorators.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The object does not exist.
    #[error("{kind} '{id}' not found")]
    NotFound {
        /// Kind of the missing object.
        kind: ResourceKind,
        /// Name of the missing object.
        id: String,
    },
    /// An object with the same name already exists.
    #[error("{kind} '{id}' already exists")]
    AlreadyExists {
        /// Kind of the conflicting object.
        kind: ResourceKind,
        /// Name of the conflicting object.
        id: String,
    },
    /// The node failed its health check.
    #[error("node '{id}' is not healthy")]
    Unhealthy {
        /// Name of the unhealthy node.
        id: String,
    },
    /// The registry variant does not support the operation.
    #[error("{operation} is not supported by the {registry} registry")]
    Unsupported {
        /// Registry variant that rejected the call.
        registry: &'static str,
        /// Rejected operation.
        operation: &'static str,
    },
    /// The storage backend failed.
    #[error("storage error: {source}")]
    Storage {
        /// Underlying backend error.
        #[source]
        source: StorageError,
    },
    /// A stored object could not be encoded or decoded.
    #[error("failed to encode or decode {kind}: {source}")]
    Codec {
        /// Kind being processed.
        kind: ResourceKind,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// The cloud provider failed.
    #[error("cloud provider error: {source}")]
    Cloud {
        /// Underlying provider error.
        #[source]
        source: CloudError,
    },
}

impl RegistryError {
    /// Builds a `NotFound` error.
    pub(crate) fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Builds an `Unsupported` error.
    pub(crate) fn unsupported(registry: &'static str, operation: &'static str) -> Self {
        Self::Unsupported {
            registry,
            operation,
        }
    }

    /// Maps a storage error, translating key conflicts into object conflicts.
    pub(crate) fn from_storage(kind: ResourceKind, id: &str, source: StorageError) -> Self {
        match source {
            StorageError::AlreadyExists { .. } => Self::AlreadyExists {
                kind,
                id: id.to_owned(),
            },
            StorageError::NotFound { .. } => Self::not_found(kind, id),
            other => Self::Storage { source: other },
        }
    }

    /// Returns `true` for `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<CloudError> for RegistryError {
    fn from(source: CloudError) -> Self {
        Self::Cloud { source }
    }
}

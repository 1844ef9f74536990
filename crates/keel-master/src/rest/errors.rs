use thiserror::Error;

use crate::api::ResourceKind;
use crate::cloud::CloudError;
use crate::registry::RegistryError;

/// Errors returned by REST storage adapters.
#[derive(Debug, Error)]
pub enum RestError {
    /// The adapter does not serve the requested verb.
    #[error("{method} is not supported for {kind}")]
    MethodNotSupported {
        /// Kind the request targeted.
        kind: ResourceKind,
        /// Rejected verb.
        method: &'static str,
    },
    /// The request body does not describe a valid object.
    #[error("invalid {kind} object: {source}")]
    InvalidObject {
        /// Kind the request targeted.
        kind: ResourceKind,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// A stored object could not be rendered as JSON.
    #[error("failed to encode {kind}: {source}")]
    Encode {
        /// Kind being rendered.
        kind: ResourceKind,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// The backing registry failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The cloud provider failed or lacks a required capability.
    #[error("cloud provider error: {source}")]
    Cloud {
        /// Underlying provider error.
        #[source]
        source: CloudError,
    },
}

impl RestError {
    pub(crate) fn unsupported(kind: ResourceKind, method: &'static str) -> Self {
        Self::MethodNotSupported { kind, method }
    }

    /// Returns `true` when the target object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Registry(error) if error.is_not_found())
    }
}

impl From<CloudError> for RestError {
    fn from(source: CloudError) -> Self {
        Self::Cloud { source }
    }
}

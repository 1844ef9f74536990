//! Versioned API surface handed to the REST front end.
//!
//! Every exported version sees the same resource kinds. What differs per
//! version is the codec stamping objects with their `apiVersion` and the root
//! path links are built under.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::api::ResourceKind;
use crate::rest::RestStorage;

const API_VERSION_FIELD: &str = "apiVersion";
const SELF_LINK_FIELD: &str = "selfLink";

/// API versions served by the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiVersion {
    /// The original API.
    V1Beta1,
    /// The revised API.
    V1Beta2,
}

impl ApiVersion {
    /// Every served version, oldest first.
    pub const ALL: [Self; 2] = [Self::V1Beta1, Self::V1Beta2];

    /// Wire name of the version.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1Beta1 => "v1beta1",
            Self::V1Beta2 => "v1beta2",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Errors raised while encoding, decoding or linking objects.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload is not valid JSON.
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The payload is valid JSON but not an object.
    #[error("expected a JSON object")]
    NotAnObject,
    /// The payload declares a different API version.
    #[error("payload is stamped '{found}' but this codec serves '{expected}'")]
    VersionMismatch {
        /// Version served by the codec.
        expected: ApiVersion,
        /// Version found in the payload.
        found: String,
    },
}

/// Converts objects to and from the wire format of one API version.
pub trait Codec: Send + Sync {
    /// Version served by the codec.
    fn version(&self) -> ApiVersion;

    /// Renders an object, stamping it with the codec's version.
    fn encode(&self, object: &Value) -> Result<Vec<u8>, CodecError>;

    /// Parses an object, rejecting payloads stamped with another version.
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// JSON codec that records the version in an `apiVersion` field.
#[derive(Debug, Clone, Copy)]
pub struct JsonCodec {
    version: ApiVersion,
}

impl JsonCodec {
    /// Builds a codec for `version`.
    #[must_use]
    pub fn new(version: ApiVersion) -> Self {
        Self { version }
    }
}

impl Codec for JsonCodec {
    fn version(&self) -> ApiVersion {
        self.version
    }

    fn encode(&self, object: &Value) -> Result<Vec<u8>, CodecError> {
        let mut stamped = as_object(object)?.clone();
        stamped.insert(
            API_VERSION_FIELD.to_owned(),
            Value::String(self.version.as_str().to_owned()),
        );
        Ok(serde_json::to_vec(&stamped)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let mut value: Value = serde_json::from_slice(bytes)?;
        let object = value.as_object_mut().ok_or(CodecError::NotAnObject)?;
        match object.remove(API_VERSION_FIELD) {
            None => {}
            Some(Value::String(found)) if found == self.version.as_str() => {}
            Some(other) => {
                return Err(CodecError::VersionMismatch {
                    expected: self.version,
                    found: other.as_str().map_or_else(|| other.to_string(), str::to_owned),
                });
            }
        }
        Ok(value)
    }
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, CodecError> {
    value.as_object().ok_or(CodecError::NotAnObject)
}

/// Computes and records canonical object URLs.
pub trait SelfLinker: Send + Sync {
    /// Builds the link for an object of `kind` named `id` under `root`.
    fn link_for(&self, root: &str, kind: ResourceKind, id: &str) -> String;

    /// Reads the link recorded on `object`.
    fn self_link(&self, object: &Value) -> Option<String>;

    /// Records `link` on `object`.
    fn set_self_link(&self, object: &mut Value, link: &str) -> Result<(), CodecError>;
}

/// Self-linker storing links in a top-level `selfLink` field.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSelfLinker;

impl SelfLinker for JsonSelfLinker {
    fn link_for(&self, root: &str, kind: ResourceKind, id: &str) -> String {
        format!("{}/{kind}/{id}", root.trim_end_matches('/'))
    }

    fn self_link(&self, object: &Value) -> Option<String> {
        object
            .get(SELF_LINK_FIELD)
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    fn set_self_link(&self, object: &mut Value, link: &str) -> Result<(), CodecError> {
        let fields = object.as_object_mut().ok_or(CodecError::NotAnObject)?;
        fields.insert(SELF_LINK_FIELD.to_owned(), Value::String(link.to_owned()));
        Ok(())
    }
}

/// Resource-kind name to REST storage adapter.
pub type StorageMap = HashMap<String, Arc<dyn RestStorage>>;

/// Everything the front end needs to serve one API version.
///
/// `storage` is a private copy; mutating it never affects the master or any
/// other exported group. `self_linker` is shared by every version.
pub struct ApiGroup {
    /// Adapters keyed by resource-kind name.
    pub storage: StorageMap,
    /// Wire codec for this version.
    pub codec: Arc<dyn Codec>,
    /// Root path the version is served under.
    pub root: String,
    /// Link builder shared across versions.
    pub self_linker: Arc<dyn SelfLinker>,
}

impl ApiGroup {
    /// Version served by this group.
    #[must_use]
    pub fn version(&self) -> ApiVersion {
        self.codec.version()
    }

    /// Resource-kind names in this group, sorted.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.storage.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Canonical link for an object of `kind` named `id` in this version.
    #[must_use]
    pub fn link(&self, kind: ResourceKind, id: &str) -> String {
        self.self_linker.link_for(&self.root, kind, id)
    }
}

impl fmt::Debug for ApiGroup {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ApiGroup")
            .field("version", &self.version())
            .field("root", &self.root)
            .field("kinds", &self.kinds())
            .finish_non_exhaustive()
    }
}

//! Resource kinds and object types.

mod kind;
mod types;

pub use kind::{ResourceKind, ResourceKindParseError};
pub use types::{
    Binding, ContainerManifest, ContainerState, ContainerStatus, Endpoints, EnvVar, Event, Labels,
    Node, NodeResources, Pod, PodInfo, ReplicationController, Resource, Service,
    selector_matches,
};

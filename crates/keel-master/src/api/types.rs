//! Object types stored and served by the master.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ResourceKind;

/// Label set attached to pods and matched by selectors.
pub type Labels = BTreeMap<String, String>;

/// Objects persisted through a registry.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Kind under which the object is stored.
    const KIND: ResourceKind;

    /// Unique name of the object within its kind.
    fn id(&self) -> &str;
}

/// Capacity advertised by a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResources {
    /// CPU capacity in millicores.
    pub milli_cpu: u64,
    /// Memory capacity in bytes.
    pub memory_bytes: u64,
}

/// A cluster member machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Host name of the node.
    pub id: String,
    /// Address reported by the cloud provider, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    /// Advertised capacity.
    #[serde(default)]
    pub resources: NodeResources,
}

impl Node {
    /// Builds a node with the given capacity.
    #[must_use]
    pub fn new(id: impl Into<String>, resources: NodeResources) -> Self {
        Self {
            id: id.into(),
            host_ip: None,
            resources,
        }
    }
}

/// Lifecycle state of a single container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum ContainerState {
    /// Not started yet.
    Waiting,
    /// Currently running.
    Running,
    /// Exited with the given code.
    Terminated {
        /// Process exit code.
        exit_code: i32,
    },
}

/// Runtime status of a container as reported by its node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatus {
    /// Current state.
    #[serde(flatten)]
    pub state: ContainerState,
    /// Number of restarts observed so far.
    #[serde(default)]
    pub restart_count: u32,
}

/// Per-container runtime status of a pod, keyed by container name.
pub type PodInfo = BTreeMap<String, ContainerStatus>;

/// A unit of scheduled work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    /// Pod name.
    pub id: String,
    /// Labels matched by controllers and services.
    #[serde(default)]
    pub labels: Labels,
    /// Host the pod is bound to, once scheduled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Address of the bound host, filled in on read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    /// Container status, filled in on read from the pod cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<PodInfo>,
    /// Manifest handed to the node agent, written when the pod is bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<ContainerManifest>,
}

/// One environment variable injected into a pod's containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    /// Variable name.
    pub name: String,
    /// Variable value.
    pub value: String,
}

impl EnvVar {
    /// Builds a variable.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// What a node agent needs to run a bound pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerManifest {
    /// Pod the manifest belongs to.
    pub id: String,
    /// Host the pod is bound to.
    pub host: String,
    /// Environment shared by every container of the pod.
    #[serde(default)]
    pub env: Vec<EnvVar>,
}

/// Keeps a number of matching pods running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationController {
    /// Controller name.
    pub id: String,
    /// Desired replica count.
    #[serde(default)]
    pub replicas: u32,
    /// Labels a pod must carry to count as a replica.
    #[serde(default)]
    pub selector: Labels,
    /// Observed replica count, filled in on read.
    #[serde(default)]
    pub current_replicas: u32,
}

/// A network service fronting matching pods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    /// Service name.
    pub id: String,
    /// Port the service listens on.
    pub port: u16,
    /// Labels selecting backing pods.
    #[serde(default)]
    pub selector: Labels,
    /// Requests a cloud load balancer in front of the service.
    #[serde(default)]
    pub create_external_load_balancer: bool,
}

/// Resolved addresses behind a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    /// Name of the service the endpoints belong to.
    pub id: String,
    /// `host:port` pairs.
    #[serde(default)]
    pub endpoints: Vec<String>,
}

/// Something that happened to an object in the cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event name.
    pub id: String,
    /// Reference to the object the event concerns.
    #[serde(default)]
    pub involved_object: String,
    /// Short machine-readable reason.
    #[serde(default)]
    pub reason: String,
    /// Human-readable description.
    #[serde(default)]
    pub message: String,
}

/// Assignment of a pod to a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    /// Pod being bound.
    pub pod_id: String,
    /// Host receiving the pod.
    pub host: String,
}

macro_rules! impl_resource {
    ($type:ty, $kind:expr, $field:ident) => {
        impl Resource for $type {
            const KIND: ResourceKind = $kind;

            fn id(&self) -> &str {
                self.$field.as_str()
            }
        }
    };
}

impl_resource!(Node, ResourceKind::Minions, id);
impl_resource!(Pod, ResourceKind::Pods, id);
impl_resource!(ReplicationController, ResourceKind::ReplicationControllers, id);
impl_resource!(Service, ResourceKind::Services, id);
impl_resource!(Endpoints, ResourceKind::Endpoints, id);
impl_resource!(Event, ResourceKind::Events, id);
impl_resource!(Binding, ResourceKind::Bindings, pod_id);

/// Returns `true` when every selector entry is present in `labels`.
///
/// An empty selector matches nothing.
#[must_use]
pub fn selector_matches(selector: &Labels, labels: &Labels) -> bool {
    !selector.is_empty()
        && selector
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
}

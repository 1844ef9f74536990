use std::sync::Arc;

use serde_json::Value;

use crate::api::{Pod, Resource, ResourceKind};
use crate::cloud::{CloudProvider, Instances};
use crate::pod_cache::{PodCache, PodInfoGetter};
use crate::registry::PodRegistry;

use super::{RestError, RestStorage, decode, encode, encode_all};

/// Serves pods, attaching container state and host addresses on read.
pub struct PodStorage {
    pods: Arc<PodRegistry>,
    cache: Arc<PodCache>,
    pod_info: Arc<dyn PodInfoGetter>,
    instances: Option<Arc<dyn Instances>>,
}

impl PodStorage {
    /// Builds the adapter. Host addresses are only filled in when the cloud
    /// offers instance lookups.
    #[must_use]
    pub fn new(
        pods: Arc<PodRegistry>,
        cache: Arc<PodCache>,
        pod_info: Arc<dyn PodInfoGetter>,
        cloud: Option<&Arc<dyn CloudProvider>>,
    ) -> Self {
        Self {
            pods,
            cache,
            pod_info,
            instances: cloud.and_then(|cloud| cloud.instances()),
        }
    }

    fn fill_host_ip(&self, pod: &mut Pod) {
        let (Some(instances), Some(host)) = (&self.instances, pod.host.as_deref()) else {
            return;
        };
        pod.host_ip = instances.ip_address(host).ok();
    }

    fn decorate_cached(&self, mut pod: Pod) -> Pod {
        if let Some(host) = pod.host.as_deref() {
            pod.info = self.cache.get_pod_info(host, &pod.id).ok();
        }
        self.fill_host_ip(&mut pod);
        pod
    }

    fn decorate_live(&self, mut pod: Pod) -> Pod {
        if let Some(host) = pod.host.as_deref() {
            pod.info = self
                .cache
                .get_pod_info(host, &pod.id)
                .or_else(|_| self.pod_info.get_pod_info(host, &pod.id))
                .ok();
        }
        self.fill_host_ip(&mut pod);
        pod
    }
}

impl RestStorage for PodStorage {
    fn kind(&self) -> ResourceKind {
        Pod::KIND
    }

    fn list(&self) -> Result<Vec<Value>, RestError> {
        let pods: Vec<Pod> = self
            .pods
            .list()?
            .into_iter()
            .map(|pod| self.decorate_cached(pod))
            .collect();
        encode_all(Pod::KIND, &pods)
    }

    fn get(&self, id: &str) -> Result<Value, RestError> {
        let pod = self.decorate_live(self.pods.get(id)?);
        encode(Pod::KIND, &pod)
    }

    fn create(&self, object: Value) -> Result<Value, RestError> {
        let mut pod: Pod = decode(Pod::KIND, object)?;
        pod.info = None;
        pod.host_ip = None;
        pod.manifest = None;
        self.pods.create(&pod)?;
        encode(Pod::KIND, &pod)
    }

    fn delete(&self, id: &str) -> Result<(), RestError> {
        Ok(self.pods.delete(id)?)
    }
}

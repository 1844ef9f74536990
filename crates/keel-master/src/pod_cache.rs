//! Cached container state for every bound pod.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::PodInfo;
use crate::registry::PodRegistry;

pub(crate) const POD_CACHE_TARGET: &str = "keel_master::pod_cache";

/// Errors reported when fetching container state.
#[derive(Debug, Error)]
pub enum PodInfoError {
    /// No state is known for the pod yet.
    #[error("no container information available for pod '{pod_id}'")]
    NotAvailable {
        /// Pod that was queried.
        pod_id: String,
    },
    /// The node agent could not be queried.
    #[error("failed to fetch container information for pod '{pod_id}' from '{host}': {message}")]
    Fetch {
        /// Host that was queried.
        host: String,
        /// Pod that was queried.
        pod_id: String,
        /// Human-readable cause.
        message: String,
    },
}

impl PodInfoError {
    /// Builds a `NotAvailable` error.
    #[must_use]
    pub fn not_available(pod_id: impl Into<String>) -> Self {
        Self::NotAvailable {
            pod_id: pod_id.into(),
        }
    }

    /// Returns `true` for `NotAvailable`.
    #[must_use]
    pub fn is_not_available(&self) -> bool {
        matches!(self, Self::NotAvailable { .. })
    }
}

/// Source of per-pod container state, normally the agent running on the node.
#[cfg_attr(test, mockall::automock)]
pub trait PodInfoGetter: Send + Sync {
    /// Fetches the container state of `pod_id` from `host`.
    fn get_pod_info(&self, host: &str, pod_id: &str) -> Result<PodInfo, PodInfoError>;
}

/// Getter used when no node agent is reachable; every lookup is `NotAvailable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailablePodInfo;

impl PodInfoGetter for UnavailablePodInfo {
    fn get_pod_info(&self, _host: &str, pod_id: &str) -> Result<PodInfo, PodInfoError> {
        Err(PodInfoError::not_available(pod_id))
    }
}

/// Last known container state of every bound pod.
///
/// The cache is only written by [`PodCache::update_all_containers`]; readers
/// see whatever the most recent refresh stored.
pub struct PodCache {
    getter: Arc<dyn PodInfoGetter>,
    pods: Arc<PodRegistry>,
    entries: RwLock<HashMap<String, PodInfo>>,
}

impl PodCache {
    /// Builds an empty cache over the pod registry.
    #[must_use]
    pub fn new(getter: Arc<dyn PodInfoGetter>, pods: Arc<PodRegistry>) -> Self {
        Self {
            getter,
            pods,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached state of `pod_id`.
    ///
    /// The host is accepted for parity with [`PodInfoGetter`]; entries are
    /// keyed by pod alone.
    pub fn get_pod_info(&self, _host: &str, pod_id: &str) -> Result<PodInfo, PodInfoError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(pod_id)
            .cloned()
            .ok_or_else(|| PodInfoError::not_available(pod_id))
    }

    /// Number of pods with cached state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when nothing has been cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refreshes the state of every bound pod.
    ///
    /// A failed listing ends the pass and leaves the cache untouched. A failed
    /// lookup for one pod does not stop the others and keeps that pod's last
    /// known state; `NotAvailable` is expected for freshly bound pods, is not
    /// logged and clears the entry. Pods that are no longer listed or bound
    /// are dropped.
    pub fn update_all_containers(&self) {
        let pods = match self.pods.list() {
            Ok(pods) => pods,
            Err(error) => {
                warn!(
                    target: POD_CACHE_TARGET,
                    error = %error,
                    "failed to list pods for container refresh"
                );
                return;
            }
        };

        let mut bound = HashSet::new();
        let mut updates = Vec::new();
        for pod in pods {
            let Some(host) = pod.host.as_deref() else {
                continue;
            };
            match self.getter.get_pod_info(host, &pod.id) {
                Ok(info) => updates.push((pod.id.clone(), Some(info))),
                Err(error) if error.is_not_available() => updates.push((pod.id.clone(), None)),
                Err(error) => warn!(
                    target: POD_CACHE_TARGET,
                    pod = %pod.id,
                    host,
                    error = %error,
                    "failed to refresh container information"
                ),
            }
            bound.insert(pod.id);
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|pod_id, _| bound.contains(pod_id));
        let mut refreshed = 0_usize;
        for (pod_id, info) in updates {
            match info {
                Some(info) => {
                    entries.insert(pod_id, info);
                    refreshed += 1;
                }
                None => {
                    entries.remove(&pod_id);
                }
            }
        }
        debug!(
            target: POD_CACHE_TARGET,
            refreshed,
            cached = entries.len(),
            "container refresh pass finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ContainerState, ContainerStatus, Pod};
    use crate::storage::{InMemoryStorage, StorageBackend};
    use mockall::predicate::eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn pods() -> Arc<PodRegistry> {
        let storage: Arc<dyn StorageBackend> = Arc::new(InMemoryStorage::new());
        Arc::new(PodRegistry::new(storage))
    }

    fn bound(id: &str, host: Option<&str>) -> Pod {
        Pod {
            id: id.to_owned(),
            host: host.map(str::to_owned),
            ..Pod::default()
        }
    }

    fn running() -> PodInfo {
        PodInfo::from([(
            "app".to_owned(),
            ContainerStatus {
                state: ContainerState::Running,
                restart_count: 0,
            },
        )])
    }

    #[rstest]
    fn refresh_stores_info_for_bound_pods(pods: Arc<PodRegistry>) {
        pods.create(&bound("web-1", Some("n1"))).expect("create");
        pods.create(&bound("web-2", None)).expect("create");
        let mut getter = MockPodInfoGetter::new();
        getter
            .expect_get_pod_info()
            .with(eq("n1"), eq("web-1"))
            .times(1)
            .returning(|_, _| Ok(running()));

        let cache = PodCache::new(Arc::new(getter), pods);
        cache.update_all_containers();

        assert_eq!(cache.get_pod_info("n1", "web-1").expect("cached"), running());
        assert!(
            cache
                .get_pod_info("", "web-2")
                .expect_err("unbound pod")
                .is_not_available()
        );
    }

    #[rstest]
    fn one_failing_pod_does_not_stop_the_pass(pods: Arc<PodRegistry>) {
        pods.create(&bound("a", Some("n1"))).expect("create");
        pods.create(&bound("b", Some("n2"))).expect("create");
        pods.create(&bound("c", Some("n3"))).expect("create");
        let mut getter = MockPodInfoGetter::new();
        getter
            .expect_get_pod_info()
            .with(eq("n1"), eq("a"))
            .returning(|host, pod_id| {
                Err(PodInfoError::Fetch {
                    host: host.to_owned(),
                    pod_id: pod_id.to_owned(),
                    message: "connection reset".to_owned(),
                })
            });
        getter
            .expect_get_pod_info()
            .with(eq("n2"), eq("b"))
            .returning(|_, pod_id| Err(PodInfoError::not_available(pod_id)));
        getter
            .expect_get_pod_info()
            .with(eq("n3"), eq("c"))
            .returning(|_, _| Ok(running()));

        let cache = PodCache::new(Arc::new(getter), pods);
        cache.update_all_containers();

        assert_eq!(cache.len(), 1);
        assert!(cache.get_pod_info("n3", "c").is_ok());
    }

    #[rstest]
    fn deleted_pods_leave_the_cache(pods: Arc<PodRegistry>) {
        pods.create(&bound("web-1", Some("n1"))).expect("create");
        let mut getter = MockPodInfoGetter::new();
        getter
            .expect_get_pod_info()
            .with(eq("n1"), eq("web-1"))
            .times(1)
            .returning(|_, _| Ok(running()));
        let cache = PodCache::new(Arc::new(getter), Arc::clone(&pods));
        cache.update_all_containers();
        assert_eq!(cache.len(), 1);

        pods.delete("web-1").expect("delete");
        cache.update_all_containers();

        assert!(cache.is_empty());
    }

    #[rstest]
    fn failed_lookups_keep_the_last_known_state(pods: Arc<PodRegistry>) {
        pods.create(&bound("web-1", Some("n1"))).expect("create");
        let mut getter = MockPodInfoGetter::new();
        let mut calls = 0;
        getter
            .expect_get_pod_info()
            .times(3)
            .returning(move |host, pod_id| {
                calls += 1;
                match calls {
                    1 => Ok(running()),
                    2 => Err(PodInfoError::Fetch {
                        host: host.to_owned(),
                        pod_id: pod_id.to_owned(),
                        message: "timeout".to_owned(),
                    }),
                    _ => Err(PodInfoError::not_available(pod_id)),
                }
            });
        let cache = PodCache::new(Arc::new(getter), pods);

        cache.update_all_containers();
        cache.update_all_containers();
        assert_eq!(cache.get_pod_info("n1", "web-1").expect("kept"), running());

        cache.update_all_containers();
        assert!(cache.is_empty());
    }

    #[rstest]
    fn empty_cache_reports_not_available(pods: Arc<PodRegistry>) {
        let cache = PodCache::new(Arc::new(UnavailablePodInfo), pods);
        assert!(cache.is_empty());
        assert!(
            cache
                .get_pod_info("n1", "missing")
                .expect_err("nothing cached")
                .is_not_available()
        );
    }
}

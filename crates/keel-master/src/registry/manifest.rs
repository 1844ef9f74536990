//! Manifests written into pods when they are bound to a host.

use std::sync::Arc;

use crate::api::{ContainerManifest, EnvVar, Pod, Service};

use super::{RegistryError, ServiceRegistry};

/// Builds the manifest a node agent receives for a bound pod.
pub trait ManifestFactory: Send + Sync {
    /// Renders the manifest for `pod` running on `host`.
    fn make_manifest(&self, host: &str, pod: &Pod) -> Result<ContainerManifest, RegistryError>;
}

/// Injects the address of every registered service into the pod environment.
pub struct BasicManifestFactory {
    services: Arc<ServiceRegistry>,
}

impl BasicManifestFactory {
    /// Builds a factory reading services from `services`.
    #[must_use]
    pub fn new(services: Arc<ServiceRegistry>) -> Self {
        Self { services }
    }
}

impl ManifestFactory for BasicManifestFactory {
    fn make_manifest(&self, host: &str, pod: &Pod) -> Result<ContainerManifest, RegistryError> {
        let services = self.services.list()?;
        Ok(ContainerManifest {
            id: pod.id.clone(),
            host: host.to_owned(),
            env: service_environment(&services, host),
        })
    }
}

/// Environment advertising `services` as reachable through `host`.
///
/// `SERVICE_HOST` comes first, followed by `<NAME>_SERVICE_PORT` and a
/// link-style `<NAME>_PORT` for each service in registry order.
#[must_use]
pub fn service_environment(services: &[Service], host: &str) -> Vec<EnvVar> {
    let mut env = vec![EnvVar::new("SERVICE_HOST", host)];
    for service in services {
        let name = env_name(&service.id);
        env.push(EnvVar::new(
            format!("{name}_SERVICE_PORT"),
            service.port.to_string(),
        ));
        env.push(EnvVar::new(
            format!("{name}_PORT"),
            format!("tcp://{host}:{}", service.port),
        ));
    }
    env
}

fn env_name(service_id: &str) -> String {
    service_id
        .chars()
        .map(|ch| if ch == '-' || ch == '.' { '_' } else { ch.to_ascii_uppercase() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryStorage, StorageBackend};
    use rstest::rstest;

    fn service(id: &str, port: u16) -> Service {
        Service {
            id: id.to_owned(),
            port,
            ..Service::default()
        }
    }

    #[rstest]
    fn environment_lists_every_service() {
        let env = service_environment(&[service("redis-master", 6379)], "n1");
        assert_eq!(
            env,
            vec![
                EnvVar::new("SERVICE_HOST", "n1"),
                EnvVar::new("REDIS_MASTER_SERVICE_PORT", "6379"),
                EnvVar::new("REDIS_MASTER_PORT", "tcp://n1:6379"),
            ]
        );
    }

    #[rstest]
    fn factory_reads_the_service_registry() {
        let storage: Arc<dyn StorageBackend> = Arc::new(InMemoryStorage::new());
        let services = Arc::new(ServiceRegistry::new(storage));
        services.create(&service("frontend", 80)).expect("create service");
        let factory = BasicManifestFactory::new(services);

        let pod = Pod {
            id: "web-1".to_owned(),
            ..Pod::default()
        };
        let manifest = factory.make_manifest("n2", &pod).expect("manifest");

        assert_eq!(manifest.id, "web-1");
        assert_eq!(manifest.host, "n2");
        assert!(manifest.env.contains(&EnvVar::new("FRONTEND_SERVICE_PORT", "80")));
    }
}

//! Layered configuration for the keel control-plane master.
//!
//! [`Settings`] is resolved by `ortho_config` from built-in defaults, an
//! optional TOML file (`--config-path` or `KEEL_CONFIG_PATH`), `KEEL_*`
//! environment variables and command-line flags, in increasing order of
//! precedence. The settings describe operational policy only; runtime
//! collaborators such as the storage backend or the cloud provider are wired
//! by the master itself.

mod defaults;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_EVENT_TTL_SECS, DEFAULT_HEALTH_CHECK_PORT, DEFAULT_LOG_FILTER,
    DEFAULT_NODE_MEMORY_BYTES, DEFAULT_NODE_MILLI_CPU, DEFAULT_V1BETA1_ROOT,
    DEFAULT_V1BETA2_ROOT, default_log_filter, default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Operational policy read once when the master starts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "KEEL")]
pub struct Settings {
    /// `tracing` filter directive applied to the master's telemetry.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Output format for structured logs.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
    /// Wraps the node registry in a health-filtering layer when set.
    #[serde(default)]
    pub health_check_nodes: bool,
    /// Node identifiers registered when cloud discovery is not in use.
    #[serde(default)]
    pub nodes: Vec<String>,
    /// Lifetime of cached node listings; zero disables the cache.
    #[serde(default)]
    pub node_cache_ttl_secs: u64,
    /// Lifetime of stored events.
    #[serde(default = "defaults::default_event_ttl_secs")]
    pub event_ttl_secs: u64,
    /// Instance-name pattern used for cloud node discovery.
    #[serde(default)]
    pub node_pattern: String,
    /// CPU capacity in millicores given to statically registered nodes.
    #[serde(default = "defaults::default_node_milli_cpu")]
    pub node_milli_cpu: u64,
    /// Memory capacity in bytes given to statically registered nodes.
    #[serde(default = "defaults::default_node_memory_bytes")]
    pub node_memory_bytes: u64,
    /// Port checked on each node when health checking is enabled.
    #[serde(default = "defaults::default_health_check_port")]
    pub health_check_port: u16,
    /// Root path under which the `v1beta1` API is served.
    #[serde(default = "defaults::default_v1beta1_root")]
    pub v1beta1_root: String,
    /// Root path under which the `v1beta2` API is served.
    #[serde(default = "defaults::default_v1beta2_root")]
    pub v1beta2_root: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            health_check_nodes: false,
            nodes: Vec::new(),
            node_cache_ttl_secs: 0,
            event_ttl_secs: DEFAULT_EVENT_TTL_SECS,
            node_pattern: String::new(),
            node_milli_cpu: DEFAULT_NODE_MILLI_CPU,
            node_memory_bytes: DEFAULT_NODE_MEMORY_BYTES,
            health_check_port: DEFAULT_HEALTH_CHECK_PORT,
            v1beta1_root: DEFAULT_V1BETA1_ROOT.to_owned(),
            v1beta2_root: DEFAULT_V1BETA2_ROOT.to_owned(),
        }
    }
}

impl Settings {
    /// Filter directive used to initialise telemetry.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format used to initialise telemetry.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Cache lifetime for node listings; [`Duration::ZERO`] disables caching.
    #[must_use]
    pub fn node_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.node_cache_ttl_secs)
    }

    /// Time-to-live applied to stored events.
    #[must_use]
    pub fn event_ttl(&self) -> Duration {
        Duration::from_secs(self.event_ttl_secs)
    }

    /// Returns `true` when cloud discovery has a pattern to match against.
    #[must_use]
    pub fn has_node_pattern(&self) -> bool {
        !self.node_pattern.trim().is_empty()
    }
}

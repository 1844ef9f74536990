use crate::logging::LogFormat;

/// Default log filter expression used by the master.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Events are kept for two days unless configured otherwise.
pub const DEFAULT_EVENT_TTL_SECS: u64 = 48 * 60 * 60;

/// CPU capacity, in millicores, assigned to statically registered nodes.
pub const DEFAULT_NODE_MILLI_CPU: u64 = 1_000;

/// Memory capacity assigned to statically registered nodes (3 GiB).
pub const DEFAULT_NODE_MEMORY_BYTES: u64 = 3 * 1024 * 1024 * 1024;

/// Port checked when node health checking is enabled.
pub const DEFAULT_HEALTH_CHECK_PORT: u16 = 10_250;

/// Root path exported for the `v1beta1` API.
pub const DEFAULT_V1BETA1_ROOT: &str = "/api/v1beta1";

/// Root path exported for the `v1beta2` API.
pub const DEFAULT_V1BETA2_ROOT: &str = "/api/v1beta2";

/// Default log filter expression used by the master.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the master.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

pub(crate) fn default_event_ttl_secs() -> u64 {
    DEFAULT_EVENT_TTL_SECS
}

pub(crate) fn default_node_milli_cpu() -> u64 {
    DEFAULT_NODE_MILLI_CPU
}

pub(crate) fn default_node_memory_bytes() -> u64 {
    DEFAULT_NODE_MEMORY_BYTES
}

pub(crate) fn default_health_check_port() -> u16 {
    DEFAULT_HEALTH_CHECK_PORT
}

pub(crate) fn default_v1beta1_root() -> String {
    DEFAULT_V1BETA1_ROOT.to_owned()
}

pub(crate) fn default_v1beta2_root() -> String {
    DEFAULT_V1BETA2_ROOT.to_owned()
}

use crate::logging::LogFormat;

/// Address the command listener binds to by default.
pub const DEFAULT_LISTEN_HOST: &str = "127.0.0.1";

/// Port the command listener binds to by default.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Default log filter expression used by the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Host version reported to commands and used for compatibility checks.
pub const DEFAULT_HOST_VERSION: &str = "2025";

/// Global command timeout applied when neither the registry entry nor the
/// command declares one.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 10_000;

/// How long the host loop sleeps between queue checks when idle.
pub const DEFAULT_HOST_IDLE_INTERVAL_MS: u64 = 50;

/// Default listen host as an owned string.
pub fn default_listen_host() -> String {
    DEFAULT_LISTEN_HOST.to_owned()
}

/// Default log filter expression used by the daemon.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the daemon.
pub fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default host version as an owned string.
pub fn default_host_version() -> String {
    DEFAULT_HOST_VERSION.to_owned()
}

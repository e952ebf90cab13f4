//! Configuration for the hostbridge daemon.
//!
//! [`Config`] layers built-in defaults, an optional TOML configuration file,
//! `HOSTBRIDGE_*` environment variables and command-line flags, in that
//! order of precedence. The command registry file referenced by
//! [`Config::commands_file`] is a separate JSON document modelled by
//! [`RegistryFile`].

mod defaults;
mod logging;
mod registry_file;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_HOST_IDLE_INTERVAL_MS, DEFAULT_HOST_VERSION,
    DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT, DEFAULT_LOG_FILTER, default_host_version,
    default_listen_host, default_log_filter, default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use registry_file::{
    BUILTIN_MODULE, CommandConfig, ConfigFileError, DeveloperInfo, RegistryFile, ServiceSettings,
};

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "HOSTBRIDGE")]
pub struct Config {
    /// Address the command listener binds to.
    #[ortho_config(default = default_listen_host())]
    pub listen_host: String,
    /// Port the command listener binds to. `0` asks the OS for a free port.
    #[ortho_config(default = DEFAULT_LISTEN_PORT)]
    pub listen_port: u16,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log events.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Host version used for command compatibility checks.
    #[ortho_config(default = default_host_version())]
    pub host_version: String,
    /// Command registry file. When absent every built-in command is exposed.
    pub commands_file: Option<Utf8PathBuf>,
    /// Base directory for relative plugin paths.
    pub commands_dir: Option<Utf8PathBuf>,
    /// Global command timeout in milliseconds.
    #[ortho_config(default = DEFAULT_COMMAND_TIMEOUT_MS)]
    pub command_timeout_ms: u64,
    /// Idle polling interval of the host loop in milliseconds.
    #[ortho_config(default = DEFAULT_HOST_IDLE_INTERVAL_MS)]
    pub host_idle_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: default_listen_host(),
            listen_port: DEFAULT_LISTEN_PORT,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            host_version: default_host_version(),
            commands_file: None,
            commands_dir: None,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            host_idle_interval_ms: DEFAULT_HOST_IDLE_INTERVAL_MS,
        }
    }
}

impl Config {
    /// Returns the listen address as `host:port`.
    #[must_use]
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }

    /// Returns the configured log filter.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the host version string.
    #[must_use]
    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    /// Returns the registry file path, if configured.
    #[must_use]
    pub fn commands_file(&self) -> Option<&Utf8Path> {
        self.commands_file.as_deref()
    }

    /// Returns the directory relative plugin paths resolve against.
    ///
    /// Falls back to the registry file's directory when no explicit
    /// directory is configured.
    #[must_use]
    pub fn commands_dir(&self) -> Option<Utf8PathBuf> {
        self.commands_dir.clone().or_else(|| {
            self.commands_file
                .as_deref()
                .and_then(Utf8Path::parent)
                .map(Utf8Path::to_path_buf)
        })
    }

    /// Returns the global command timeout.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Returns the idle polling interval of the host loop.
    #[must_use]
    pub const fn host_idle_interval(&self) -> Duration {
        Duration::from_millis(self.host_idle_interval_ms)
    }
}

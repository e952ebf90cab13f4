//! Command registry file model.
//!
//! The registry file is a JSON document listing the commands the daemon
//! should expose, where their implementations live, and which host versions
//! they support:
//!
//! ```json
//! {
//!   "commands": [
//!     {
//!       "commandName": "create_wall",
//!       "modulePath": "plugins/{VERSION}/walls.json",
//!       "enabled": true,
//!       "supportedHostVersions": ["2024", "2025"],
//!       "developer": {"name": "Ada", "email": "ada@example.com"},
//!       "description": "Creates walls along a polyline",
//!       "timeoutMs": 30000
//!     }
//!   ],
//!   "settings": {"port": 8080, "logLevel": "info"}
//! }
//! ```

use std::fs;
use std::io;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Module path naming the compiled-in command catalogue.
pub const BUILTIN_MODULE: &str = "builtin";

/// Errors raised while reading the registry file.
#[derive(Debug, Clone, Error)]
pub enum ConfigFileError {
    /// The file exists but could not be read.
    #[error("failed to read command registry '{path}': {source}")]
    Read {
        /// File that failed to load.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: Arc<io::Error>,
    },
    /// The file is not a valid registry document.
    #[error("failed to parse command registry '{path}': {source}")]
    Parse {
        /// File that failed to parse.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },
}

/// Top-level registry document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryFile {
    /// Command entries in file order.
    #[serde(default)]
    pub commands: Vec<CommandConfig>,
    /// Service-wide settings recorded alongside the commands.
    #[serde(default)]
    pub settings: ServiceSettings,
}

impl RegistryFile {
    /// Reads the registry file at `path`.
    ///
    /// Returns `Ok(None)` when the file does not exist so callers can decide
    /// how loudly to report the absence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigFileError`] when the file cannot be read or parsed.
    pub fn read(path: &Utf8Path) -> Result<Option<Self>, ConfigFileError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(ConfigFileError::Read {
                    path: path.to_owned(),
                    source: Arc::new(error),
                });
            }
        };
        Self::parse(&text)
            .map(Some)
            .map_err(|source| ConfigFileError::Parse {
                path: path.to_owned(),
                source: Arc::new(source),
            })
    }

    /// Parses a registry document from text.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the text is not a registry document.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// One command entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandConfig {
    /// Name clients use as the request method.
    pub command_name: String,
    /// Where the implementation lives: `builtin` or a plugin manifest path.
    /// May contain a `{VERSION}` placeholder.
    #[serde(alias = "assemblyPath")]
    pub module_path: String,
    /// Disabled entries are skipped at load time.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Host versions the command supports; empty means all.
    #[serde(default)]
    pub supported_host_versions: Vec<String>,
    /// Provenance of the command.
    #[serde(default)]
    pub developer: DeveloperInfo,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Per-command timeout override in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl CommandConfig {
    /// Builds an enabled entry with no version restrictions.
    pub fn new(command_name: impl Into<String>, module_path: impl Into<String>) -> Self {
        Self {
            command_name: command_name.into(),
            module_path: module_path.into(),
            enabled: true,
            supported_host_versions: Vec::new(),
            developer: DeveloperInfo::default(),
            description: String::new(),
            timeout_ms: None,
        }
    }

    /// Returns `true` when the entry names the compiled-in catalogue.
    pub fn is_builtin(&self) -> bool {
        self.module_path.trim().eq_ignore_ascii_case(BUILTIN_MODULE)
    }
}

const fn default_enabled() -> bool {
    true
}

/// Developer provenance attached to a command entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DeveloperInfo {
    /// Developer name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Website.
    pub website: String,
    /// Organisation.
    pub organization: String,
}

/// Service-wide settings stored in the registry file.
///
/// These are informational: the daemon configuration decides the listen
/// port and log filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceSettings {
    /// Requested listen port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Requested log level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

//! Errors raised while loading or running plugin processes.
//!
//! I/O errors are wrapped in `Arc` so the enum stays cheap to clone and
//! satisfies the `result_large_err` lint.

use std::path::PathBuf;
use std::sync::Arc;

use camino::Utf8PathBuf;
use hostbridge_protocol::ErrorCode;
use thiserror::Error;

use crate::error::CommandError;

/// Errors arising from plugin operations.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// The manifest file could not be read.
    #[error("failed to read plugin manifest '{path}': {source}")]
    ManifestRead {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The manifest file is not valid JSON or misses required fields.
    #[error("failed to parse plugin manifest '{path}': {source}")]
    ManifestParse {
        /// Manifest path.
        path: Utf8PathBuf,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// A manifest failed validation.
    #[error("manifest error: {message}")]
    Manifest {
        /// Description of the validation failure.
        message: String,
    },

    /// The plugin process could not be spawned.
    #[error("plugin '{name}' failed to start: {message}")]
    SpawnFailed {
        /// Plugin name.
        name: String,
        /// Human-readable failure description.
        message: String,
        /// Optional underlying I/O error.
        #[source]
        source: Option<Arc<std::io::Error>>,
    },

    /// The plugin did not complete within its process budget.
    #[error("plugin '{name}' timed out after {timeout_secs}s")]
    Timeout {
        /// Plugin name.
        name: String,
        /// Configured budget in seconds.
        timeout_secs: u64,
    },

    /// The plugin exited with a non-zero status code.
    #[error("plugin '{name}' exited with non-zero status {status}")]
    NonZeroExit {
        /// Plugin name.
        name: String,
        /// Process exit status.
        status: i32,
    },

    /// The plugin request could not be serialised to JSON.
    #[error("failed to serialise plugin request: {0}")]
    SerializeRequest(#[source] Arc<serde_json::Error>),

    /// The plugin response could not be deserialised from JSON.
    #[error("plugin '{name}' produced invalid JSON: {source}")]
    DeserializeResponse {
        /// Plugin name.
        name: String,
        /// Underlying JSON error.
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// The plugin produced output that does not conform to the protocol.
    #[error("plugin '{name}' wrote invalid output: {message}")]
    InvalidOutput {
        /// Plugin name.
        name: String,
        /// Description of the protocol violation.
        message: String,
    },

    /// An I/O error occurred while communicating with the plugin process.
    #[error("I/O error communicating with plugin '{name}': {source}")]
    Io {
        /// Plugin name.
        name: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The plugin executable was not found on the filesystem.
    #[error("plugin '{name}' executable not found: {path}")]
    ExecutableNotFound {
        /// Plugin name.
        name: String,
        /// Path that was checked.
        path: PathBuf,
    },
}

impl From<PluginError> for CommandError {
    fn from(error: PluginError) -> Self {
        match error {
            PluginError::Timeout { .. } => {
                Self::host(ErrorCode::CommandExecutionTimeout, error.to_string())
            }
            other => Self::internal(other.to_string()),
        }
    }
}

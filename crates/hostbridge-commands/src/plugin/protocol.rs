//! JSONL messages exchanged with plugin processes.
//!
//! The daemon writes one [`PluginRequest`] line to the plugin's stdin and
//! reads one [`PluginResponse`] line from its stdout.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CommandError;

/// Request sent to a plugin process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRequest {
    /// Command to run.
    pub command: String,
    /// Parameters forwarded from the client; `null` when absent.
    pub params: Value,
    /// Client request identifier.
    pub request_id: Option<String>,
    /// Version of the running host.
    pub host_version: String,
}

/// Failure reported by a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginFailure {
    /// Wire error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Response read from a plugin process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginResponse {
    /// Whether the command succeeded.
    pub success: bool,
    /// Result value on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure detail when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PluginFailure>,
}

impl PluginResponse {
    /// Builds a successful response.
    #[must_use]
    pub const fn success(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Builds a failed response.
    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(PluginFailure {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Converts the response into a command outcome.
    ///
    /// A successful response without a result yields `null`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Reported`] with the plugin's code for failed
    /// responses, or [`CommandError::Internal`] when a failure carries no
    /// detail.
    pub fn into_result(self, plugin: &str) -> Result<Value, CommandError> {
        if self.success {
            return Ok(self.result.unwrap_or(Value::Null));
        }
        match self.error {
            Some(failure) => Err(CommandError::Reported {
                code: failure.code,
                message: failure.message,
                data: failure.data,
            }),
            None => Err(CommandError::internal(format!(
                "plugin '{plugin}' reported failure without detail"
            ))),
        }
    }
}

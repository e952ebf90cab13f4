//! The command abstraction.
//!
//! A command splits its work in two. [`Command::prepare`] runs on the
//! session thread that received the request: it validates and converts the
//! parameters and returns a [`HostJob`]. The job is later executed on the
//! host thread, which is the only place the [`Document`] may be touched.

use std::fmt;
use std::time::Duration;

use hostbridge_protocol::RequestId;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::document::Document;
use crate::error::CommandError;

/// Work executed on the host thread with exclusive access to the document.
pub type HostJob = Box<dyn FnOnce(&mut Document) -> Result<Value, CommandError> + Send + 'static>;

/// Host information handed to commands when they are loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostHandle {
    host_version: String,
}

impl HostHandle {
    /// Describes a host running the given version.
    pub fn new(host_version: impl Into<String>) -> Self {
        Self {
            host_version: host_version.into(),
        }
    }

    /// Returns the host version string.
    #[must_use]
    pub fn host_version(&self) -> &str {
        &self.host_version
    }
}

/// A named operation clients can invoke.
///
/// # Example
///
/// ```
/// use hostbridge_commands::{Command, CommandError, Document, HostJob};
/// use hostbridge_protocol::RequestId;
/// use serde_json::{Value, json};
///
/// struct CountElements;
///
/// impl Command for CountElements {
///     fn name(&self) -> &str {
///         "count_elements"
///     }
///
///     fn prepare(
///         &self,
///         _params: Option<&Value>,
///         _request_id: Option<&RequestId>,
///     ) -> Result<HostJob, CommandError> {
///         Ok(Box::new(|document: &mut Document| {
///             Ok(json!(document.element_count()))
///         }))
///     }
/// }
/// ```
pub trait Command: Send + Sync {
    /// Returns the name clients use as the request method.
    fn name(&self) -> &str;

    /// Returns the command's preferred timeout, if it has one.
    fn default_timeout(&self) -> Option<Duration> {
        None
    }

    /// Receives host information once, after loading and before the
    /// command is registered.
    ///
    /// # Errors
    ///
    /// An error prevents the command from being registered.
    fn initialize(&mut self, _host: &HostHandle) -> Result<(), CommandError> {
        Ok(())
    }

    /// Converts request parameters into host work.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::InvalidParams`] or
    /// [`CommandError::ParameterParsing`] when the parameters are unusable.
    fn prepare(
        &self,
        params: Option<&Value>,
        request_id: Option<&RequestId>,
    ) -> Result<HostJob, CommandError>;
}

impl fmt::Debug for dyn Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command").field("name", &self.name()).finish()
    }
}

/// Deserialises optional parameters into `T`, treating absent parameters as
/// an empty object.
///
/// # Errors
///
/// Returns [`CommandError::ParameterParsing`] when the parameters do not
/// match `T`.
pub fn parse_params<T: DeserializeOwned>(params: Option<&Value>) -> Result<T, CommandError> {
    let value = params
        .cloned()
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
    serde_json::from_value(value).map_err(|error| CommandError::from_params_error(&error))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Query {
        #[serde(default)]
        limit: Option<u32>,
    }

    #[test]
    fn absent_params_parse_as_empty_object() {
        let query: Query = parse_params(None).expect("parse");
        assert_eq!(query, Query { limit: None });
    }

    #[test]
    fn mismatched_params_report_parsing_failure() {
        let params = json!({"limit": "many"});
        let error = parse_params::<Query>(Some(&params)).expect_err("must fail");
        assert!(matches!(error, CommandError::ParameterParsing { .. }));
    }

    #[test]
    fn host_handle_exposes_version() {
        assert_eq!(HostHandle::new("2025").host_version(), "2025");
    }
}

//! Command doubles for tests in this and downstream crates.
//!
//! Enabled for unit tests and through the `test-support` feature.

use std::sync::Arc;
use std::time::Duration;

use hostbridge_protocol::RequestId;
use serde_json::{Value, json};

use crate::command::{Command, HostHandle, HostJob};
use crate::document::Document;
use crate::error::CommandError;

/// Command double that echoes its name, parameters, and host version.
pub struct StubCommand {
    name: String,
    timeout: Option<Duration>,
    fail_initialise: bool,
    initialised_with: Option<String>,
}

impl StubCommand {
    /// Creates an echoing command.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            timeout: None,
            fail_initialise: false,
            initialised_with: None,
        }
    }

    /// Creates a command whose initialisation hook fails.
    #[must_use]
    pub fn failing_initialise(name: &str) -> Self {
        Self {
            fail_initialise: true,
            ..Self::new(name)
        }
    }

    /// Creates a command with a default timeout.
    #[must_use]
    pub fn with_timeout(name: &str, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::new(name)
        }
    }
}

impl Command for StubCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn initialize(&mut self, host: &HostHandle) -> Result<(), CommandError> {
        if self.fail_initialise {
            return Err(CommandError::internal("refusing to start"));
        }
        self.initialised_with = Some(host.host_version().to_owned());
        Ok(())
    }

    fn prepare(
        &self,
        params: Option<&Value>,
        _request_id: Option<&RequestId>,
    ) -> Result<HostJob, CommandError> {
        let reply = json!({
            "command": self.name,
            "params": params.cloned(),
            "host": self.initialised_with,
        });
        Ok(Box::new(move |_document: &mut Document| Ok(reply)))
    }
}

/// Host-side body run by a [`FnCommand`].
pub type HostFn = Arc<dyn Fn(Option<Value>, &mut Document) -> Result<Value, CommandError> + Send + Sync>;

/// Command whose host-side body is an arbitrary closure.
pub struct FnCommand {
    name: String,
    timeout: Option<Duration>,
    body: HostFn,
}

impl FnCommand {
    /// Wraps `body` as a command called `name`.
    pub fn new(
        name: &str,
        body: impl Fn(Option<Value>, &mut Document) -> Result<Value, CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            name: name.to_owned(),
            timeout: None,
            body: Arc::new(body),
        }
    }

    /// Sets the command's default timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Command for FnCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn prepare(
        &self,
        params: Option<&Value>,
        _request_id: Option<&RequestId>,
    ) -> Result<HostJob, CommandError> {
        let body = Arc::clone(&self.body);
        let params = params.cloned();
        Ok(Box::new(move |document: &mut Document| body(params, document)))
    }
}

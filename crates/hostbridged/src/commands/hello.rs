//! Connectivity check.

use std::time::Duration;

use hostbridge_commands::{Command, CommandError, Document, HostJob};
use hostbridge_protocol::RequestId;
use serde_json::{Value, json};

use super::QUERY_TIMEOUT;

/// Replies `{"execute": true}` once the host context has run it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SayHello;

impl SayHello {
    /// Method name.
    pub const NAME: &'static str = "say_hello";
}

impl Command for SayHello {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn default_timeout(&self) -> Option<Duration> {
        Some(QUERY_TIMEOUT)
    }

    fn prepare(
        &self,
        _params: Option<&Value>,
        _request_id: Option<&RequestId>,
    ) -> Result<HostJob, CommandError> {
        Ok(Box::new(|_document: &mut Document| {
            Ok(json!({ "execute": true }))
        }))
    }
}

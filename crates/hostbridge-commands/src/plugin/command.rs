//! Commands backed by plugin processes.

use std::sync::Arc;

use hostbridge_protocol::RequestId;
use serde_json::Value;
use tracing::debug;

use super::manifest::PluginManifest;
use super::protocol::PluginRequest;
use super::PluginExecutor;
use crate::command::{Command, HostHandle, HostJob};
use crate::document::Document;
use crate::error::CommandError;

const PLUGIN_COMMAND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::plugin::command");

/// A command implemented by an external plugin.
///
/// The plugin process is spawned from the host job, so plugin runs are
/// serialised with every other piece of host work.
pub struct PluginCommand {
    name: String,
    manifest: Arc<PluginManifest>,
    executor: Arc<dyn PluginExecutor>,
    host_version: Option<String>,
}

impl PluginCommand {
    /// Binds `name` to a manifest and executor.
    pub fn new(
        name: impl Into<String>,
        manifest: Arc<PluginManifest>,
        executor: Arc<dyn PluginExecutor>,
    ) -> Self {
        Self {
            name: name.into(),
            manifest,
            executor,
            host_version: None,
        }
    }

    /// Returns the manifest backing this command.
    #[must_use]
    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }
}

impl Command for PluginCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, host: &HostHandle) -> Result<(), CommandError> {
        self.host_version = Some(host.host_version().to_owned());
        Ok(())
    }

    fn prepare(
        &self,
        params: Option<&Value>,
        request_id: Option<&RequestId>,
    ) -> Result<HostJob, CommandError> {
        let host_version = self.host_version.clone().ok_or_else(|| {
            CommandError::internal(format!("plugin command '{}' was not initialised", self.name))
        })?;
        let request = PluginRequest {
            command: self.name.clone(),
            params: params.cloned().unwrap_or(Value::Null),
            request_id: request_id.map(|id| id.as_str().to_owned()),
            host_version,
        };
        let manifest = Arc::clone(&self.manifest);
        let executor = Arc::clone(&self.executor);
        Ok(Box::new(move |_document: &mut Document| {
            debug!(
                target: PLUGIN_COMMAND_TARGET,
                plugin = manifest.name(),
                command = %request.command,
                "running plugin command"
            );
            let response = executor.execute(&manifest, &request)?;
            response.into_result(manifest.name())
        }))
    }
}

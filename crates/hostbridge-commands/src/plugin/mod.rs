//! External command modules.
//!
//! A plugin is an executable described by a [`PluginManifest`]. Each
//! command it declares is exposed as a [`PluginCommand`]; when the command
//! runs on the host thread the executable is spawned through a
//! [`PluginExecutor`] and spoken to over single-line JSONL on stdio.

mod command;
mod error;
mod manifest;
pub mod process;
mod protocol;

pub use self::command::PluginCommand;
pub use self::error::PluginError;
pub use self::manifest::{DeclaredCommand, PluginManifest};
pub use self::process::ProcessExecutor;
pub use self::protocol::{PluginFailure, PluginRequest, PluginResponse};

/// Runs a plugin for one request.
///
/// The production implementation is [`ProcessExecutor`]. Tests substitute
/// doubles that return canned responses without spawning processes.
pub trait PluginExecutor: Send + Sync {
    /// Executes the plugin described by `manifest` with `request`.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] if the plugin cannot be spawned, overruns
    /// its budget, exits with a non-zero status, or produces invalid output.
    fn execute(
        &self,
        manifest: &PluginManifest,
        request: &PluginRequest,
    ) -> Result<PluginResponse, PluginError>;
}

//! Plugin manifests.
//!
//! A manifest is a JSON file describing an external command module: the
//! executable to spawn, its arguments, a process budget, and the commands
//! it implements.
//!
//! ```json
//! {
//!   "name": "sample-set",
//!   "version": "1.0.0",
//!   "executable": "/opt/hostbridge/bin/sample-set",
//!   "args": ["--stdio"],
//!   "timeoutSecs": 30,
//!   "commands": [{"name": "create_wall", "description": "Creates walls"}]
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use super::error::PluginError;

/// Default process budget in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A command a plugin declares it implements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredCommand {
    /// Command name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

impl DeclaredCommand {
    /// Declares a command without a description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }
}

/// Declarative description of a plugin module.
///
/// # Example
///
/// ```
/// use hostbridge_commands::plugin::{DeclaredCommand, PluginManifest};
/// use std::path::PathBuf;
///
/// let manifest = PluginManifest::new("walls", "1.0.0", PathBuf::from("/usr/bin/walls"))
///     .with_commands(vec![DeclaredCommand::new("create_wall")]);
///
/// assert_eq!(manifest.timeout_secs(), 30);
/// assert_eq!(manifest.count_declarations("create_wall"), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    name: String,
    #[serde(default)]
    version: String,
    executable: PathBuf,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    #[serde(default)]
    commands: Vec<DeclaredCommand>,
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl PluginManifest {
    /// Creates a manifest with the default budget and no declared commands.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>, executable: PathBuf) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            executable,
            args: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            commands: Vec::new(),
        }
    }

    /// Reads and validates a manifest file.
    ///
    /// A relative `executable` is resolved against the manifest's directory.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ManifestRead`], [`PluginError::ManifestParse`]
    /// or [`PluginError::Manifest`] when the file cannot be used.
    pub fn read(path: &Utf8Path) -> Result<Self, PluginError> {
        let text = fs::read_to_string(path).map_err(|source| PluginError::ManifestRead {
            path: path.to_owned(),
            source: Arc::new(source),
        })?;
        let mut manifest: Self =
            serde_json::from_str(&text).map_err(|source| PluginError::ManifestParse {
                path: path.to_owned(),
                source: Arc::new(source),
            })?;
        if manifest.executable.is_relative() {
            if let Some(parent) = path.parent() {
                manifest.executable = parent.as_std_path().join(&manifest.executable);
            }
        }
        manifest.validate()?;
        Ok(manifest)
    }

    /// Appends default arguments to pass to the plugin executable.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Overrides the default budget.
    #[must_use]
    pub const fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Declares the commands this plugin implements.
    #[must_use]
    pub fn with_commands(mut self, commands: Vec<DeclaredCommand>) -> Self {
        self.commands = commands;
        self
    }

    /// Validates the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Manifest`] if the name is empty, the
    /// executable path is not absolute, or the budget is zero.
    pub fn validate(&self) -> Result<(), PluginError> {
        if self.name.trim().is_empty() {
            return Err(PluginError::Manifest {
                message: String::from("plugin name must not be empty"),
            });
        }
        if !self.executable.is_absolute() {
            return Err(PluginError::Manifest {
                message: format!(
                    "plugin executable must be an absolute path, got '{}'",
                    self.executable.display()
                ),
            });
        }
        if self.timeout_secs == 0 {
            return Err(PluginError::Manifest {
                message: format!("plugin '{}' must declare a non-zero timeout", self.name),
            });
        }
        Ok(())
    }

    /// Returns the plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plugin version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the absolute path to the plugin executable.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Returns the default arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the process budget in seconds.
    #[must_use]
    pub const fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Returns the declared commands.
    #[must_use]
    pub fn commands(&self) -> &[DeclaredCommand] {
        &self.commands
    }

    /// Counts declarations matching `command_name`.
    #[must_use]
    pub fn count_declarations(&self, command_name: &str) -> usize {
        self.commands
            .iter()
            .filter(|declared| declared.name == command_name)
            .count()
    }
}

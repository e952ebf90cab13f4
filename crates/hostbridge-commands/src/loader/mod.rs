//! Building command tables from the registry file.
//!
//! [`CommandLoader`] walks the configured command entries in file order,
//! skips disabled and version-incompatible ones, resolves each remaining
//! entry to an implementation (the compiled-in [`BuiltinCatalog`] or a
//! plugin manifest), initialises it, and collects the results into a fresh
//! [`CommandTable`]. A failing entry is logged and skipped; it never stops
//! the rest of the file from loading.

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use hostbridge_config::{Config, ConfigFileError, RegistryFile};
use thiserror::Error;
use tracing::{info, warn};

use crate::command::{Command, HostHandle};
use crate::descriptor::{CommandDescriptor, ModuleSource};
use crate::error::CommandError;
use crate::plugin::{PluginCommand, PluginError, PluginExecutor, PluginManifest, ProcessExecutor};
use crate::registry::{CommandRegistry, CommandTable};

const LOADER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::loader");

/// Constructor for a compiled-in command.
pub type CommandFactory = Arc<dyn Fn() -> Box<dyn Command> + Send + Sync>;

/// Compiled-in command implementations, keyed by declared name.
#[derive(Clone, Default)]
pub struct BuiltinCatalog {
    entries: Vec<(String, CommandFactory)>,
}

impl BuiltinCatalog {
    /// Creates an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory declared under `name`.
    #[must_use]
    pub fn with(
        mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Command> + Send + Sync + 'static,
    ) -> Self {
        self.register(name, factory);
        self
    }

    /// Adds a factory declared under `name`.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Box<dyn Command> + Send + Sync + 'static,
    ) {
        self.entries.push((name.into(), Arc::new(factory)));
    }

    /// Returns the declared names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Returns the factories declared under `name`.
    fn matching(&self, name: &str) -> Vec<&CommandFactory> {
        self.entries
            .iter()
            .filter(|(declared, _)| declared == name)
            .map(|(_, factory)| factory)
            .collect()
    }
}

impl fmt::Debug for BuiltinCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Errors raised while loading commands.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The registry file could not be read. Aborts the whole load.
    #[error(transparent)]
    RegistryFile(#[from] ConfigFileError),
    /// A plugin manifest could not be used.
    #[error("command '{command}': {source}")]
    Manifest {
        /// Command being loaded.
        command: String,
        /// Underlying plugin error.
        #[source]
        source: PluginError,
    },
    /// The module does not implement the command.
    #[error("command '{command}' is not declared by module '{module}'")]
    CommandNotDeclared {
        /// Command being loaded.
        command: String,
        /// Module that was searched.
        module: String,
    },
    /// The module declares the command more than once.
    #[error("command '{command}' is declared {count} times by module '{module}'")]
    AmbiguousCommand {
        /// Command being loaded.
        command: String,
        /// Module that was searched.
        module: String,
        /// Number of matching declarations.
        count: usize,
    },
    /// The command rejected initialisation.
    #[error("command '{command}' failed to initialise: {source}")]
    Initialize {
        /// Command being loaded.
        command: String,
        /// Error returned by the command.
        #[source]
        source: CommandError,
    },
}

/// Entry that failed to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedCommand {
    /// Command name.
    pub name: String,
    /// Rendered failure.
    pub reason: String,
}

/// Outcome of one load pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Commands that were loaded, in file order.
    pub loaded: Vec<String>,
    /// Commands replaced by a later entry with the same name.
    pub replaced: Vec<String>,
    /// Disabled entries.
    pub disabled: Vec<String>,
    /// Entries that do not support the running host version.
    pub incompatible: Vec<String>,
    /// Entries that failed to load.
    pub failed: Vec<FailedCommand>,
}

/// Loads command tables from configuration.
pub struct CommandLoader {
    catalog: BuiltinCatalog,
    executor: Arc<dyn PluginExecutor>,
    host: HostHandle,
    commands_file: Option<Utf8PathBuf>,
    commands_dir: Option<Utf8PathBuf>,
}

impl CommandLoader {
    /// Creates a loader that exposes every built-in command and runs plugins
    /// as child processes.
    #[must_use]
    pub fn new(catalog: BuiltinCatalog, host: HostHandle) -> Self {
        Self {
            catalog,
            executor: Arc::new(ProcessExecutor),
            host,
            commands_file: None,
            commands_dir: None,
        }
    }

    /// Creates a loader from daemon configuration.
    #[must_use]
    pub fn from_config(config: &Config, catalog: BuiltinCatalog) -> Self {
        Self::new(catalog, HostHandle::new(config.host_version()))
            .with_commands_file(config.commands_file().map(Utf8Path::to_path_buf))
            .with_commands_dir(config.commands_dir())
    }

    /// Replaces the plugin executor.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn PluginExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Sets the registry file; `None` exposes every built-in command.
    #[must_use]
    pub fn with_commands_file(mut self, path: Option<Utf8PathBuf>) -> Self {
        self.commands_file = path;
        self
    }

    /// Sets the base directory for relative module paths.
    #[must_use]
    pub fn with_commands_dir(mut self, dir: Option<Utf8PathBuf>) -> Self {
        self.commands_dir = dir;
        self
    }

    /// Returns the host description handed to commands.
    #[must_use]
    pub const fn host(&self) -> &HostHandle {
        &self.host
    }

    /// Reads the configured command entries in file order.
    ///
    /// A missing registry file yields no entries and a warning. Without a
    /// configured file every catalogue entry is described as a built-in.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::RegistryFile`] when the file exists but cannot
    /// be read or parsed.
    pub fn descriptors(&self) -> Result<Vec<CommandDescriptor>, LoadError> {
        let Some(path) = self.commands_file.as_deref() else {
            return Ok(self.catalog.names().map(CommandDescriptor::builtin).collect());
        };
        let Some(file) = RegistryFile::read(path)? else {
            warn!(
                target: LOADER_TARGET,
                path = %path,
                "command registry file not found; no commands configured"
            );
            return Ok(Vec::new());
        };
        info!(
            target: LOADER_TARGET,
            path = %path,
            entries = file.commands.len(),
            requested_port = ?file.settings.port,
            requested_log_level = ?file.settings.log_level,
            "read command registry file"
        );
        Ok(file.commands.into_iter().map(CommandDescriptor::from).collect())
    }

    /// Builds a complete table from the configured entries.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::RegistryFile`] when the registry file is
    /// unreadable. Per-command failures are recorded in the report instead.
    pub fn build_table(&self) -> Result<(CommandTable, LoadReport), LoadError> {
        let descriptors = self.descriptors()?;
        Ok(self.load_descriptors(descriptors))
    }

    /// Builds a table from explicit descriptors.
    #[must_use]
    pub fn load_descriptors(
        &self,
        descriptors: Vec<CommandDescriptor>,
    ) -> (CommandTable, LoadReport) {
        let mut table = CommandTable::new();
        let mut report = LoadReport::default();
        let host_version = self.host.host_version();

        for descriptor in descriptors {
            let name = descriptor.name().to_owned();
            if !descriptor.is_enabled() {
                info!(target: LOADER_TARGET, command = %name, "command disabled; skipping");
                report.disabled.push(name);
                continue;
            }
            if !descriptor.supports(host_version) {
                warn!(
                    target: LOADER_TARGET,
                    command = %name,
                    host_version,
                    supported = ?descriptor.supported_host_versions(),
                    "command does not support this host version; skipping"
                );
                report.incompatible.push(name);
                continue;
            }
            match self.instantiate(&descriptor) {
                Ok(command) => {
                    info!(
                        target: LOADER_TARGET,
                        command = %name,
                        developer = descriptor.developer().name.as_str(),
                        "command loaded"
                    );
                    if table.insert(descriptor, command).is_some() {
                        report.replaced.push(name.clone());
                    }
                    report.loaded.push(name);
                }
                Err(error) => {
                    warn!(target: LOADER_TARGET, command = %name, %error, "failed to load command");
                    report.failed.push(FailedCommand {
                        name,
                        reason: error.to_string(),
                    });
                }
            }
        }
        (table, report)
    }

    /// Rebuilds the table and publishes it into `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::RegistryFile`] when the registry file is
    /// unreadable; the registry keeps its current table in that case.
    pub fn reload(&self, registry: &CommandRegistry) -> Result<LoadReport, LoadError> {
        let mut report = None;
        registry.reload(|| {
            let (table, built) = self.build_table()?;
            report = Some(built);
            Ok::<_, LoadError>(table)
        })?;
        Ok(report.unwrap_or_default())
    }

    fn instantiate(&self, descriptor: &CommandDescriptor) -> Result<Box<dyn Command>, LoadError> {
        let name = descriptor.name();
        let source = descriptor.module_source(self.host.host_version(), self.commands_dir.as_deref());
        let mut command = match source {
            ModuleSource::Builtin => self.builtin(name)?,
            ModuleSource::Manifest(path) => self.from_manifest(name, &path)?,
        };
        command
            .initialize(&self.host)
            .map_err(|source| LoadError::Initialize {
                command: name.to_owned(),
                source,
            })?;
        Ok(command)
    }

    fn builtin(&self, name: &str) -> Result<Box<dyn Command>, LoadError> {
        let module = hostbridge_config::BUILTIN_MODULE;
        match self.catalog.matching(name).as_slice() {
            [factory] => Ok(factory()),
            [] => Err(LoadError::CommandNotDeclared {
                command: name.to_owned(),
                module: module.to_owned(),
            }),
            many => Err(LoadError::AmbiguousCommand {
                command: name.to_owned(),
                module: module.to_owned(),
                count: many.len(),
            }),
        }
    }

    fn from_manifest(&self, name: &str, path: &Utf8Path) -> Result<Box<dyn Command>, LoadError> {
        let manifest = PluginManifest::read(path).map_err(|source| LoadError::Manifest {
            command: name.to_owned(),
            source,
        })?;
        match manifest.count_declarations(name) {
            1 => Ok(Box::new(PluginCommand::new(
                name,
                Arc::new(manifest),
                Arc::clone(&self.executor),
            ))),
            0 => Err(LoadError::CommandNotDeclared {
                command: name.to_owned(),
                module: path.to_string(),
            }),
            count => Err(LoadError::AmbiguousCommand {
                command: name.to_owned(),
                module: path.to_string(),
                count,
            }),
        }
    }
}

impl fmt::Debug for CommandLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLoader")
            .field("catalog", &self.catalog)
            .field("host", &self.host)
            .field("commands_file", &self.commands_file)
            .field("commands_dir", &self.commands_dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;

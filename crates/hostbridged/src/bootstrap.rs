//! Daemon bootstrap orchestration.

use std::sync::Arc;

use hostbridge_commands::{BuiltinCatalog, CommandLoader, CommandRegistry, LoadError, LoadReport};
use hostbridge_config::Config;
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use crate::health::HealthReporter;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader error when no valid configuration can be built.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`OrthoConfig::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that always yields the same configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps a ready-made configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The command registry file could not be used.
    #[error("failed to load commands: {source}")]
    Commands {
        /// Underlying loader error.
        #[source]
        source: LoadError,
    },
}

/// Result of a successful bootstrap: configuration plus a populated
/// command registry.
pub struct Daemon {
    config: Config,
    registry: Arc<CommandRegistry>,
    loader: CommandLoader,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Daemon {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the live command registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Returns the loader used for reloads.
    #[must_use]
    pub const fn loader(&self) -> &CommandLoader {
        &self.loader
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Returns the health reporter.
    #[must_use]
    pub fn reporter(&self) -> Arc<dyn HealthReporter> {
        Arc::clone(&self.reporter)
    }

    /// Rebuilds the command table from the registry file and publishes it.
    ///
    /// In-flight requests finish against the table they resolved from.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the registry file cannot be used; the
    /// previous table stays live.
    pub fn reload_commands(&self) -> Result<LoadReport, LoadError> {
        match self.loader.reload(&self.registry) {
            Ok(report) => {
                self.reporter.commands_loaded(&report);
                Ok(report)
            }
            Err(error) => {
                self.reporter.commands_reload_failed(&error);
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// Loads configuration, installs telemetry, and builds the initial command
/// table from `catalog` and the configured registry file.
///
/// # Errors
///
/// Returns [`BootstrapError`] for the first stage that fails. The reporter
/// sees the failure before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    catalog: BuiltinCatalog,
) -> Result<Daemon, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let commands = CommandLoader::from_config(&config, catalog);
    let registry = Arc::new(CommandRegistry::new());
    let report = match commands.reload(&registry) {
        Ok(report) => report,
        Err(source) => {
            let error = BootstrapError::Commands { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };
    reporter.commands_loaded(&report);
    reporter.bootstrap_succeeded(&config);

    Ok(Daemon {
        config,
        registry,
        loader: commands,
        telemetry,
        reporter,
    })
}

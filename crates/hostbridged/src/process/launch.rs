//! Supervises daemon launch sequencing and runtime orchestration.

use std::sync::Arc;

use hostbridge_commands::{BuiltinCatalog, Document};
use tracing::{info, warn};

use crate::bootstrap::{ConfigLoader, Daemon, SystemConfigLoader, bootstrap_with};
use crate::commands;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::service::{RunningService, ServiceOptions};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::signals::{ProcessSignals, SignalAction, SystemSignals};

/// Collaborators required to launch the daemon runtime.
pub struct LaunchPlan<L, S> {
    /// Configuration source.
    pub loader: L,
    /// Lifecycle event sink.
    pub reporter: Arc<dyn HealthReporter>,
    /// Signal source driving reloads and shutdown.
    pub signals: S,
    /// Compiled-in commands.
    pub catalog: BuiltinCatalog,
}

/// Runs the daemon using the production collaborators.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, the service, or signal handling
/// fails.
pub fn run_daemon() -> Result<(), LaunchError> {
    let plan = LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        signals: SystemSignals::install()?,
        catalog: commands::catalog(),
    };
    run_daemon_with(plan)
}

/// Runs the daemon with injected collaborators until a stop signal.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap, the service, or signal handling
/// fails. The service is stopped before any signal error is returned.
pub fn run_daemon_with<L, S>(plan: LaunchPlan<L, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ProcessSignals,
{
    let LaunchPlan {
        loader,
        reporter,
        mut signals,
        catalog,
    } = plan;

    let daemon = bootstrap_with(&loader, Arc::clone(&reporter), catalog)?;
    let options = ServiceOptions::from(daemon.config());
    let document = Document::new(format!("hostbridge {}", daemon.config().host_version()));
    let service = RunningService::start(&options, Arc::clone(daemon.registry()), document)?;
    reporter.service_started(service.local_addr());

    let outcome = supervise(&daemon, &mut signals);

    reporter.service_stopping();
    service.stop()?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    outcome
}

fn supervise<S: ProcessSignals>(daemon: &Daemon, signals: &mut S) -> Result<(), LaunchError> {
    loop {
        match signals.wait()? {
            SignalAction::Stop => return Ok(()),
            SignalAction::Reload => match daemon.reload_commands() {
                Ok(report) => info!(
                    target: PROCESS_TARGET,
                    commands = report.loaded.len(),
                    "commands reloaded"
                ),
                Err(error) => warn!(
                    target: PROCESS_TARGET,
                    %error,
                    "reload failed; keeping previous commands"
                ),
            },
        }
    }
}

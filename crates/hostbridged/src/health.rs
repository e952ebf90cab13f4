//! Structured health reporting for daemon lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use hostbridge_commands::{LoadError, LoadReport};
use hostbridge_config::Config;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after a command table has been published.
    fn commands_loaded(&self, report: &LoadReport);

    /// Invoked when a reload fails and the previous table stays live.
    fn commands_reload_failed(&self, error: &LoadError);

    /// Invoked once the listener accepts clients.
    fn service_started(&self, addr: SocketAddr);

    /// Invoked when shutdown begins.
    fn service_stopping(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn commands_loaded(&self, report: &LoadReport) {
        (**self).commands_loaded(report);
    }

    fn commands_reload_failed(&self, error: &LoadError) {
        (**self).commands_reload_failed(error);
    }

    fn service_started(&self, addr: SocketAddr) {
        (**self).service_started(addr);
    }

    fn service_stopping(&self) {
        (**self).service_stopping();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting daemon bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            listen = %config.listen_address(),
            host_version = config.host_version(),
            commands_file = ?config.commands_file(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "daemon bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "daemon bootstrap failed"
        );
    }

    fn commands_loaded(&self, report: &LoadReport) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "commands_loaded",
            loaded = report.loaded.len(),
            disabled = report.disabled.len(),
            incompatible = report.incompatible.len(),
            failed = report.failed.len(),
            commands = ?report.loaded,
            "command table published"
        );
        for failure in &report.failed {
            tracing::warn!(
                target: HEALTH_TARGET,
                event = "command_failed",
                command = %failure.name,
                reason = %failure.reason,
                "command failed to load"
            );
        }
    }

    fn commands_reload_failed(&self, error: &LoadError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "commands_reload_failed",
            error = %error,
            "command reload failed; keeping previous commands"
        );
    }

    fn service_started(&self, addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_started",
            %addr,
            "command service accepting clients"
        );
    }

    fn service_stopping(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_stopping",
            "command service shutting down"
        );
    }
}

//! Test double for [`HealthReporter`] that records lifecycle events.

use std::net::SocketAddr;
use std::sync::Mutex;

use hostbridge_commands::{LoadError, LoadReport};
use hostbridge_config::Config;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Lifecycle events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    /// Bootstrap started.
    BootstrapStarting,
    /// Bootstrap completed.
    BootstrapSucceeded,
    /// Bootstrap failed with the rendered error.
    BootstrapFailed(String),
    /// A command table was published with the listed commands.
    CommandsLoaded(Vec<String>),
    /// A reload failed with the rendered error.
    CommandsReloadFailed(String),
    /// The listener started.
    ServiceStarted(SocketAddr),
    /// Shutdown began.
    ServiceStopping,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn commands_loaded(&self, report: &LoadReport) {
        self.record(HealthEvent::CommandsLoaded(report.loaded.clone()));
    }

    fn commands_reload_failed(&self, error: &LoadError) {
        self.record(HealthEvent::CommandsReloadFailed(error.to_string()));
    }

    fn service_started(&self, addr: SocketAddr) {
        self.record(HealthEvent::ServiceStarted(addr));
    }

    fn service_stopping(&self) {
        self.record(HealthEvent::ServiceStopping);
    }
}

//! Shared doubles for the daemon test suites.

mod config_loader;
mod reporter;

pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{HealthEvent, RecordingHealthReporter};

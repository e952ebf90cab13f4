//! Process lifecycle: launch, signal handling, and shutdown.

mod errors;
pub(crate) mod launch;
pub(crate) mod signals;
#[cfg(test)]
mod tests;

pub use errors::LaunchError;
pub use launch::{LaunchPlan, run_daemon, run_daemon_with};
pub use signals::{ProcessSignals, SignalAction, SignalError, SystemSignals};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

//! Operating system signals that drive the daemon lifecycle.

use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// What the daemon should do after a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// Reload the command registry file.
    Reload,
    /// Shut down.
    Stop,
}

/// Errors reported by signal listeners.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Source of lifecycle signals.
pub trait ProcessSignals: Send {
    /// Blocks until the next signal arrives.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError`] when signals cannot be observed.
    fn wait(&mut self) -> Result<SignalAction, SignalError>;
}

/// Listens for `SIGHUP` (reload) and `SIGTERM`, `SIGINT` or `SIGQUIT` (stop).
pub struct SystemSignals {
    signals: Signals,
}

impl SystemSignals {
    /// Installs the signal handlers.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Install`] when registration fails.
    pub fn install() -> Result<Self, SignalError> {
        let signals = Signals::new([SIGHUP, SIGTERM, SIGINT, SIGQUIT])
            .map_err(|source| SignalError::Install { source })?;
        Ok(Self { signals })
    }
}

impl std::fmt::Debug for SystemSignals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemSignals").finish_non_exhaustive()
    }
}

impl ProcessSignals for SystemSignals {
    fn wait(&mut self) -> Result<SignalAction, SignalError> {
        let Some(signal) = self.signals.forever().next() else {
            return Ok(SignalAction::Stop);
        };
        let action = action_for(signal);
        info!(target: PROCESS_TARGET, signal, ?action, "signal received");
        Ok(action)
    }
}

fn action_for(signal: i32) -> SignalAction {
    if signal == SIGHUP {
        SignalAction::Reload
    } else {
        SignalAction::Stop
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(SIGHUP, SignalAction::Reload)]
    #[case(SIGTERM, SignalAction::Stop)]
    #[case(SIGINT, SignalAction::Stop)]
    #[case(SIGQUIT, SignalAction::Stop)]
    fn signals_map_to_actions(#[case] signal: i32, #[case] expected: SignalAction) {
        assert_eq!(action_for(signal), expected);
    }
}

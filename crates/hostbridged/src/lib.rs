//! The hostbridge daemon.
//!
//! Clients connect over TCP and send JSON-RPC 2.0 requests naming a
//! registered command. Each connection is served on its own thread, but the
//! document the commands operate on belongs to a single host thread. The
//! daemon bridges the two:
//!
//! 1. a session thread decodes the request ([`codec`]) and resolves the
//!    command in the registry ([`Dispatcher`]);
//! 2. the command converts its parameters and returns a host job;
//! 3. the job crosses to the host thread through the [`bridge`], and the
//!    session waits for the result up to the command's timeout;
//! 4. the outcome is encoded as a success or error response.
//!
//! A timed-out request gets an error response straight away while the host
//! still finishes the job, so the bridge never wedges behind slow work.
//!
//! The [`run_daemon`] entry point loads configuration, installs telemetry,
//! builds the command registry from the built-in [`commands`] and any
//! plugins named in the registry file, starts the service, and reloads the
//! registry on `SIGHUP` until a stop signal arrives.

pub mod bridge;
mod bootstrap;
pub mod codec;
pub mod commands;
mod dispatch;
mod health;
mod process;
mod service;
pub mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use dispatch::Dispatcher;
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    LaunchError, LaunchPlan, ProcessSignals, SignalAction, SignalError, SystemSignals, run_daemon,
    run_daemon_with,
};
pub use service::{RunningService, ServiceError, ServiceOptions};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{
    ConnectionHandler, ListenerError, ListenerHandle, READ_CHUNK_BYTES, SessionEnd, SessionError,
    SessionHandler, TcpCommandListener,
};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

#[cfg(test)]
mod tests;

//! The running command service: host context, dispatcher, and listener.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hostbridge_commands::{CommandRegistry, Document};
use hostbridge_config::Config;
use thiserror::Error;
use tracing::info;

use crate::bridge::{HostRuntime, HostRuntimeHandle, RuntimeError};
use crate::codec::MAX_REQUEST_BYTES;
use crate::dispatch::Dispatcher;
use crate::transport::{ListenerError, ListenerHandle, SessionHandler, TcpCommandListener};

const SERVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::service");

/// Errors raised while starting or stopping the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The host context failed.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    /// The listener failed.
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Settings the service needs from the daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Host name or address to listen on.
    pub host: String,
    /// Port to listen on; `0` picks a free port.
    pub port: u16,
    /// Timeout for commands that declare none.
    pub default_timeout: Duration,
    /// Wake-up interval of an idle host context.
    pub idle_interval: Duration,
    /// Largest accepted request document.
    pub max_request_bytes: usize,
}

impl ServiceOptions {
    /// Loopback service on an ephemeral port with the default timings.
    #[must_use]
    pub fn loopback() -> Self {
        Self {
            port: 0,
            ..Self::from(&Config::default())
        }
    }
}

impl From<&Config> for ServiceOptions {
    fn from(config: &Config) -> Self {
        Self {
            host: config.listen_host.clone(),
            port: config.listen_port,
            default_timeout: config.command_timeout(),
            idle_interval: config.host_idle_interval(),
            max_request_bytes: MAX_REQUEST_BYTES,
        }
    }
}

/// Handle to a running service.
///
/// Dropping the handle signals every thread to stop without waiting; call
/// [`RunningService::stop`] for an orderly shutdown.
#[derive(Debug)]
pub struct RunningService {
    addr: SocketAddr,
    registry: Arc<CommandRegistry>,
    listener: Option<ListenerHandle>,
    host: Option<HostRuntimeHandle>,
}

impl RunningService {
    /// Starts the host context on `document` and begins accepting clients.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the host thread cannot be spawned or
    /// the listener cannot bind. Nothing is left running on error.
    pub fn start(
        options: &ServiceOptions,
        registry: Arc<CommandRegistry>,
        document: Document,
    ) -> Result<Self, ServiceError> {
        let listener = TcpCommandListener::bind(&options.host, options.port)?;
        let runtime = HostRuntime::new(document);
        let bridge = runtime.bridge();
        let host = runtime.spawn(options.idle_interval)?;
        let dispatcher = Dispatcher::new(Arc::clone(&registry), bridge, options.default_timeout);
        let handler = SessionHandler::new(Arc::new(dispatcher))
            .with_max_request_bytes(options.max_request_bytes);
        let addr = listener.local_addr();
        let listener = match listener.start(Arc::new(handler)) {
            Ok(handle) => handle,
            Err(error) => {
                host.stop();
                host.join()?;
                return Err(error.into());
            }
        };
        info!(
            target: SERVICE_TARGET,
            %addr,
            commands = registry.len(),
            "command service started"
        );
        Ok(Self {
            addr,
            registry,
            listener: Some(listener),
            host: Some(host),
        })
    }

    /// Returns the address clients connect to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the live command registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Stops accepting clients, then stops the host context.
    ///
    /// Work still queued when the host stops is abandoned and its callers
    /// receive an error response.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when a service thread panicked.
    pub fn stop(mut self) -> Result<(), ServiceError> {
        if let Some(listener) = self.listener.take() {
            listener.shutdown();
            listener.join()?;
        }
        if let Some(host) = self.host.take() {
            host.stop();
            host.join()?;
        }
        info!(target: SERVICE_TARGET, addr = %self.addr, "command service stopped");
        Ok(())
    }
}

impl Drop for RunningService {
    fn drop(&mut self) {
        if let Some(listener) = &self.listener {
            listener.shutdown();
        }
        if let Some(host) = &self.host {
            host.stop();
        }
    }
}

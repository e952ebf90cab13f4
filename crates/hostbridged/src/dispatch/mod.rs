//! JSON-RPC request dispatch.
//!
//! The [`Dispatcher`] resolves a request's method in the
//! [`CommandRegistry`], lets the command validate its parameters on the
//! calling thread, hands the resulting job to the host context through the
//! [`Bridge`], and maps the outcome to a [`Response`]:
//!
//! | Outcome | Response |
//! |---------|----------|
//! | unknown method | `MethodNotFound`, `data: {"method": name}` |
//! | parameter error | the command's code (`InvalidParams` or `CommandParameterParsingFailed`) |
//! | job succeeded | `result` |
//! | job failed | the command's code, message, and data |
//! | bridge timeout | `CommandExecutionTimeout` |
//! | bridge failure | `ExternalEventCreationFailed` / `ExternalEventExecutionFailed` |
//! | panic while preparing | `InternalError` |
//!
//! Notifications run like any other request but produce no response.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use hostbridge_commands::{CommandError, CommandRegistry, RegisteredCommand};
use hostbridge_protocol::{ErrorCode, ErrorObject, Request, Response};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::bridge::{Bridge, BridgeOutcome, panic_message};
use crate::codec;

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Executes requests against the registry through the host bridge.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    bridge: Bridge,
    default_timeout: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher.
    ///
    /// `default_timeout` applies to commands that declare no timeout of their
    /// own and have no override in the registry file.
    #[must_use]
    pub const fn new(
        registry: Arc<CommandRegistry>,
        bridge: Bridge,
        default_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            bridge,
            default_timeout,
        }
    }

    /// Returns the registry requests are resolved against.
    #[must_use]
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Decodes one message, executes it, and encodes the response.
    ///
    /// Returns `None` for notifications.
    #[must_use]
    pub fn handle_message(&self, bytes: &[u8]) -> Option<Vec<u8>> {
        match codec::decode(bytes) {
            Ok(request) => self
                .execute(&request)
                .map(|response| codec::encode(&response)),
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "rejecting request");
                Some(codec::encode(&codec::decode_failure(&error)))
            }
        }
    }

    /// Executes a validated request.
    ///
    /// Returns `None` for notifications; their command still runs.
    #[must_use]
    pub fn execute(&self, request: &Request) -> Option<Response> {
        let outcome = self.run(request);
        let Some(id) = request.id().cloned() else {
            if let Err(error) = &outcome {
                debug!(
                    target: DISPATCH_TARGET,
                    method = request.method(),
                    code = error.code,
                    message = %error.message,
                    "notification failed"
                );
            }
            return None;
        };
        Some(match outcome {
            Ok(result) => Response::success(id, result),
            Err(error) => Response::error(Some(id), error),
        })
    }

    fn run(&self, request: &Request) -> Result<Value, ErrorObject> {
        let method = request.method();
        let entry = self.registry.resolve(method).map_err(|_| {
            debug!(target: DISPATCH_TARGET, method, "method not found");
            ErrorObject::new(ErrorCode::MethodNotFound, format!("Method '{method}' not found"))
                .with_data(json!({ "method": method }))
        })?;

        let prepared = panic::catch_unwind(AssertUnwindSafe(|| {
            entry.command().prepare(request.params(), request.id())
        }))
        .unwrap_or_else(|payload| {
            Err(CommandError::internal(format!(
                "command '{method}' panicked while preparing: {}",
                panic_message(payload.as_ref())
            )))
        });
        let job = prepared.map_err(|error| {
            debug!(target: DISPATCH_TARGET, method, %error, "rejected parameters");
            error.to_error_object()
        })?;

        let timeout = self.timeout_for(&entry);
        info!(
            target: DISPATCH_TARGET,
            method,
            id = request.id().map(|id| id.as_str()),
            timeout_ms = timeout.as_millis(),
            "dispatching command"
        );
        match self.bridge.submit_and_wait(method, job, timeout) {
            Ok(BridgeOutcome::Completed(result)) => {
                result.map_err(|error| error.to_error_object())
            }
            Ok(BridgeOutcome::TimedOut) => {
                warn!(
                    target: DISPATCH_TARGET,
                    method,
                    timeout_ms = timeout.as_millis(),
                    "command timed out; host work continues in the background"
                );
                Err(ErrorObject::new(
                    ErrorCode::CommandExecutionTimeout,
                    format!(
                        "Command '{method}' timed out after {} ms",
                        timeout.as_millis()
                    ),
                ))
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, method, %error, "bridge failure");
                Err(CommandError::from(error).to_error_object())
            }
        }
    }

    fn timeout_for(&self, entry: &RegisteredCommand) -> Duration {
        entry
            .descriptor()
            .timeout()
            .or_else(|| entry.command().default_timeout())
            .unwrap_or(self.default_timeout)
    }
}

#[cfg(test)]
mod tests;

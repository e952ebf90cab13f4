//! Rendezvous between session threads and the host context.
//!
//! Session threads never touch the [`Document`]. They wrap the work in a
//! [`WorkItem`], push it onto the host queue through a [`Bridge`], and block
//! on a one-shot completion channel for at most the command's timeout. The
//! host context (see [`HostRuntime`]) runs items one at a time with exclusive
//! access to the document and always signals the completion, even when the
//! job panics.
//!
//! A timed-out caller stops waiting but the host still runs the job to
//! completion; its late result is logged and discarded. Callers must treat a
//! timeout as "outcome unknown", not "nothing happened".

mod runtime;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::time::{Duration, Instant};

use hostbridge_commands::{CommandError, Document, HostJob};
use hostbridge_protocol::ErrorCode;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use self::runtime::{HostRuntime, HostRuntimeHandle, RuntimeError};

pub(crate) const BRIDGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bridge");

/// Result type delivered by the host context.
pub type JobResult = Result<Value, CommandError>;

/// Outcome of [`Bridge::submit_and_wait`].
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeOutcome {
    /// The host ran the job before the deadline.
    Completed(JobResult),
    /// The deadline passed first. The job may still run later.
    TimedOut,
}

/// Failures delivering work to the host context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The host queue is closed.
    #[error("host context is not accepting work")]
    HostUnavailable,
    /// The host dropped the work item without running it.
    #[error("host context shut down before running the command")]
    Abandoned,
}

impl BridgeError {
    /// Returns the protocol code reported to clients.
    #[must_use]
    pub const fn code(self) -> ErrorCode {
        match self {
            Self::HostUnavailable => ErrorCode::ExternalEventCreationFailed,
            Self::Abandoned => ErrorCode::ExternalEventExecutionFailed,
        }
    }
}

impl From<BridgeError> for CommandError {
    fn from(error: BridgeError) -> Self {
        Self::host(error.code(), error.to_string())
    }
}

/// One unit of host work plus its completion channel.
pub struct WorkItem {
    label: String,
    job: HostJob,
    completion: SyncSender<JobResult>,
    submitted_at: Instant,
}

impl WorkItem {
    /// Creates an item and the receiver its caller waits on.
    #[must_use]
    pub fn new(label: impl Into<String>, job: HostJob) -> (Self, Receiver<JobResult>) {
        let (completion, receiver) = mpsc::sync_channel(1);
        let item = Self {
            label: label.into(),
            job,
            completion,
            submitted_at: Instant::now(),
        };
        (item, receiver)
    }

    /// Returns the label used in logs.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Runs the job against `document` and signals the waiting caller.
    pub(crate) fn run(self, document: &mut Document) {
        let Self {
            label,
            job,
            completion,
            submitted_at,
        } = self;
        let mut signal = Completion::new(&label, completion);
        debug!(
            target: BRIDGE_TARGET,
            command = %label,
            queued_ms = submitted_at.elapsed().as_millis(),
            "running host job"
        );
        let result = panic::catch_unwind(AssertUnwindSafe(|| job(document))).unwrap_or_else(
            |payload| {
                Err(CommandError::internal(format!(
                    "command '{label}' panicked: {}",
                    panic_message(payload.as_ref())
                )))
            },
        );
        signal.set(result);
    }
}

impl std::fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkItem")
            .field("label", &self.label)
            .field("submitted_at", &self.submitted_at)
            .finish_non_exhaustive()
    }
}

/// Signals the caller when dropped, whatever happened to the job.
struct Completion<'a> {
    label: &'a str,
    sender: SyncSender<JobResult>,
    result: Option<JobResult>,
}

impl<'a> Completion<'a> {
    const fn new(label: &'a str, sender: SyncSender<JobResult>) -> Self {
        Self {
            label,
            sender,
            result: None,
        }
    }

    fn set(&mut self, result: JobResult) {
        self.result = Some(result);
    }
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        let result = self.result.take().unwrap_or_else(|| {
            Err(CommandError::internal(format!(
                "command '{}' finished without a result",
                self.label
            )))
        });
        if self.sender.try_send(result).is_err() {
            debug!(
                target: BRIDGE_TARGET,
                command = %self.label,
                "caller stopped waiting; discarding late result"
            );
        }
    }
}

/// Submission side of the host queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Bridge {
    queue: Sender<WorkItem>,
}

impl Bridge {
    pub(crate) const fn new(queue: Sender<WorkItem>) -> Self {
        Self { queue }
    }

    /// Hands `job` to the host context and waits up to `timeout` for it to run.
    ///
    /// Every call uses a fresh [`WorkItem`], so concurrent callers can never
    /// observe each other's results.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::HostUnavailable`] when the queue is closed and
    /// [`BridgeError::Abandoned`] when the host drops the item unrun.
    pub fn submit_and_wait(
        &self,
        label: &str,
        job: HostJob,
        timeout: Duration,
    ) -> Result<BridgeOutcome, BridgeError> {
        let (item, completion) = WorkItem::new(label, job);
        self.queue
            .send(item)
            .map_err(|_| BridgeError::HostUnavailable)?;
        match completion.recv_timeout(timeout) {
            Ok(result) => Ok(BridgeOutcome::Completed(result)),
            Err(RecvTimeoutError::Timeout) => {
                debug!(
                    target: BRIDGE_TARGET,
                    command = label,
                    timeout_ms = timeout.as_millis(),
                    "host did not complete the job in time"
                );
                Ok(BridgeOutcome::TimedOut)
            }
            Err(RecvTimeoutError::Disconnected) => Err(BridgeError::Abandoned),
        }
    }
}

/// Renders a panic payload for logs and error messages.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
